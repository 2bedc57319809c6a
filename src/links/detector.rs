use regex::Regex;
use std::sync::LazyLock;

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bhttps?://\S+").unwrap());

const BRACKETS: [(char, char); 4] = [('(', ')'), ('[', ']'), ('{', '}'), ('<', '>')];

/// Find every HTTP/HTTPS URL in a chat line, in order of appearance.
///
/// Duplicates are kept. Trailing sentence punctuation and closing brackets
/// without a matching opener inside the URL are cut off.
pub fn find_urls(text: &str) -> Vec<String> {
    URL_PATTERN
        .find_iter(text)
        .map(|m| clean_url(m.as_str()))
        .collect()
}

/// Trim punctuation and stray closers until neither pass changes anything,
/// so `(see https://example.com/page.)` loses both the `)` and the `.`.
fn clean_url(raw: &str) -> String {
    let mut url = raw.to_string();
    loop {
        let before = url.len();
        url.truncate(url.trim_end_matches(['.', ',', '\'', '"']).len());
        for (open, close) in BRACKETS {
            let count = unmatched_closers(&url, open, close);
            url.truncate(url.len() - count);
        }
        if url.len() == before {
            return url;
        }
    }
}

/// Count trailing `close` characters that have no `open` to pair with.
///
/// Walks the trailing run of closers from the end; every closer consumes the
/// text after the next opener, and is unmatched when no opener is left or a
/// closer remains inside what follows that opener.
fn unmatched_closers(url: &str, open: char, close: char) -> usize {
    let mut rest = url;
    let mut count = 0;
    for ch in url.chars().rev() {
        if ch != close {
            break;
        }
        match rest.split_once(open) {
            None => count += 1,
            Some((_, after)) => {
                rest = after;
                if rest.trim_end_matches(close).contains(close) {
                    count += 1;
                }
            }
        }
    }
    count
}
