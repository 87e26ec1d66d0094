//! Spotting reference names in free-form prose.

/// Names from `names` that appear in `text`, in their original order.
///
/// Matching is a case-insensitive substring test. A multi-word name also
/// matches when only its first word appears, so "Alex" finds "Alex the Hero".
/// That is a heuristic: "Alex Baker" also matches any text mentioning Alex.
pub fn names_in_text<'a, I>(text: &str, names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let haystack = text.to_lowercase();
    let mut found: Vec<String> = Vec::new();

    for name in names {
        let lower = name.to_lowercase();
        let mut words = lower.split_whitespace();
        let first_word_only = match (words.next(), words.next()) {
            (Some(first), Some(_)) => haystack.contains(first),
            _ => false,
        };

        if (haystack.contains(&lower) || first_word_only) && !found.contains(name) {
            found.push(name.clone());
        }
    }

    found
}
