/// Longest user-text preview written to debug logs, in bytes, ellipsis included.
pub const LOG_PREVIEW_BYTES: usize = 120;

const ELLIPSIS: &str = "...";

/// Single-line preview of user supplied text for debug logs. Whitespace runs
/// collapse to one space; long text is cut on a char boundary and ends in `...`.
pub fn log_preview(s: &str) -> String {
    let flattened = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if flattened.len() <= LOG_PREVIEW_BYTES {
        return flattened;
    }

    let budget = LOG_PREVIEW_BYTES - ELLIPSIS.len();
    let cut = flattened
        .char_indices()
        .map(|(index, ch)| index + ch.len_utf8())
        .take_while(|end| *end <= budget)
        .last()
        .unwrap_or(0);
    format!("{}{}", &flattened[..cut], ELLIPSIS)
}

/// Number of Unicode scalar values in `s`; this is what the input cap counts.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}
