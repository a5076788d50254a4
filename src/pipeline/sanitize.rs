//! Path-safe file name labels.

const NAME_MAX: usize = 255;

/// Makes a free-text label safe to embed in a single path component.
///
/// Only NUL, `/`, `\` and control characters are replaced (with `_`); spaces,
/// underscores and everything else are kept as written. The result is capped
/// so that `reserve` bytes of the Linux NAME_MAX remain for a prefix and
/// extension. Returns `None` for labels that are empty, `.` or `..`.
pub fn sanitize_label(label: &str, reserve: usize) -> Option<String> {
    let replaced = label
        .chars()
        .map(|c| {
            if c == '\0' || c == '/' || c == '\\' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect::<String>();

    let limit = NAME_MAX.saturating_sub(reserve);
    let mut take = replaced.len().min(limit);
    while take > 0 && !replaced.is_char_boundary(take) {
        take -= 1;
    }
    let capped = &replaced[..take];

    match capped {
        "" | "." | ".." => None,
        _ => Some(capped.to_string()),
    }
}
