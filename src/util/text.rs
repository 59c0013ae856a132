//! Small text helpers shared by the listing resources.

/// Truncate `value` to at most `limit` words, appending `...` when text was cut.
///
/// A word is a maximal run of non-whitespace characters. Whitespace between the
/// last kept word and the cut point is dropped before the ellipsis. Strings with
/// `limit` or fewer words come back unchanged, including their whitespace.
pub fn truncate_words(value: &str, limit: usize) -> String {
    let mut words = 0usize;
    let mut in_word = false;

    for (idx, ch) in value.char_indices() {
        if ch.is_whitespace() {
            in_word = false;
        } else if !in_word {
            words += 1;
            if words > limit {
                let kept = value[..idx].trim_end();
                return format!("{kept}...");
            }
            in_word = true;
        }
    }

    value.to_string()
}
