use super::types::Annotation;

/// Join per-URL annotations into the single outbound line.
///
/// `annotations[i]` belongs to the `i + 1`th URL of the message. Index
/// markers are added whenever the message held more than one URL, and keep
/// the URL's original position even when earlier URLs said nothing.
pub fn assemble(annotations: &[Annotation]) -> Option<String> {
    let indexed = annotations.len() > 1;
    let parts: Vec<String> = annotations
        .iter()
        .enumerate()
        .filter_map(|(i, annotation)| {
            let fragments: Vec<&str> = annotation
                .iter()
                .map(String::as_str)
                .filter(|fragment| !fragment.is_empty())
                .collect();
            if fragments.is_empty() {
                return None;
            }
            let text = fragments.join(" ");
            Some(if indexed {
                format!("({}) {text}", i + 1)
            } else {
                text
            })
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(format!("{}.", parts.join(" ")))
    }
}
