use std::collections::HashSet;

/// Characters that join alphanumeric runs into one word by default.
pub const DEFAULT_UNIFYING_CHARS: &str = "-_";

/// Split captured pane text into words.
///
/// A word is a maximal run of alphanumeric characters or characters from
/// `unifying_chars`; runs made only of unifying characters are dropped.
/// Words come out in first-appearance order, each once.
pub fn coalesce(text: &str, unifying_chars: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut words = Vec::new();

    let is_word_char = |c: char| c.is_alphanumeric() || unifying_chars.contains(c);

    for run in text.split(|c: char| !is_word_char(c)) {
        if !run.chars().any(char::is_alphanumeric) {
            continue;
        }
        if seen.insert(run) {
            words.push(run.to_string());
        }
    }

    words
}
