//! Small text helpers shared by the resolvers.

const ELLIPSIS: char = '…';

/// Human readable size with binary prefixes: `1.5KiB`, `3.0MiB`.
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    let mut num = bytes as f64;
    for unit in ["", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "Zi"] {
        if num < 1024.0 {
            return format!("{num:.1}{unit}B");
        }
        num /= 1024.0;
    }
    format!("{num:.1}YiB")
}

/// Compact duration without leading zero units: `1h2m3s`, `3m45s`, `7s`.
pub fn format_duration(total_secs: u64) -> String {
    let days = total_secs / 86_400;
    let hours = total_secs % 86_400 / 3_600;
    let minutes = total_secs % 3_600 / 60;
    let seconds = total_secs % 60;
    if days > 0 {
        format!("{days}d{hours}h{minutes}m{seconds}s")
    } else if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Parse an ISO 8601 duration such as `PT3M45S` or `P1DT2H` into seconds.
///
/// Weeks and days are accepted in the date part; years and months are not,
/// since their length is ambiguous. Fractional seconds are truncated.
pub fn parse_iso8601_duration(input: &str) -> Option<u64> {
    let rest = input.trim().strip_prefix('P')?;
    if rest.is_empty() {
        return None;
    }
    let (date, time) = match rest.split_once('T') {
        Some((date, time)) if !time.is_empty() => (date, Some(time)),
        Some(_) => return None,
        None => (rest, None),
    };

    let mut total = 0u64;
    for (value, unit) in duration_fields(date)? {
        let scale = match unit {
            'W' => 604_800,
            'D' => 86_400,
            _ => return None,
        };
        total = total.checked_add(value.checked_mul(scale)?)?;
    }
    if let Some(time) = time {
        for (value, unit) in duration_fields(time)? {
            let scale = match unit {
                'H' => 3_600,
                'M' => 60,
                'S' => 1,
                _ => return None,
            };
            total = total.checked_add(value.checked_mul(scale)?)?;
        }
    }
    Some(total)
}

fn duration_fields(part: &str) -> Option<Vec<(u64, char)>> {
    let mut fields = Vec::new();
    let mut number = String::new();
    for ch in part.chars() {
        if ch.is_ascii_digit() || ch == '.' || ch == ',' {
            number.push(ch);
        } else {
            let whole = number.split(['.', ',']).next()?;
            if whole.is_empty() {
                return None;
            }
            fields.push((whole.parse().ok()?, ch));
            number.clear();
        }
    }
    number.is_empty().then_some(fields)
}

/// Cut `text` to at most `max_chars` characters, marking the cut with `…`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut truncated: String = text.chars().take(max_chars).collect();
        truncated.push(ELLIPSIS);
        truncated
    }
}

/// Fold every run of whitespace, newlines included, into one space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Wrap in curly quotes.
pub fn quote(text: &str) -> String {
    format!("“{text}”")
}
