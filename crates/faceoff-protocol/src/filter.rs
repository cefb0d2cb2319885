//! Chat profanity filter: word-boundary redaction against a fixed
//! denylist.
//!
//! A pure text transform with no state. Matching is case-insensitive and
//! whole-word; a matched word is replaced by the same number of `*`
//! characters, so redaction is visible without changing message length.
//! System dividers never pass through here — only player messages do.

/// Words redacted from player chat. Matched case-insensitively against
/// whole words only ("class" is untouched even though it contains "ass").
const DENYLIST: &[&str] = &[
    "abuse", "ass", "bastard", "bitch", "crap", "damn", "dumbass",
    "idiot", "jackass", "moron", "piss", "shit",
];

/// Redacts denylisted words from a chat message.
///
/// Idempotent: the replacement character is not a word character, so a
/// second pass finds nothing to redact.
pub fn redact(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word = String::new();

    for ch in text.chars() {
        if ch.is_alphanumeric() {
            word.push(ch);
        } else {
            flush_word(&mut out, &mut word);
            out.push(ch);
        }
    }
    flush_word(&mut out, &mut word);

    out
}

/// Appends the buffered word to `out`, starred out if denylisted.
fn flush_word(out: &mut String, word: &mut String) {
    if word.is_empty() {
        return;
    }
    let lowered = word.to_lowercase();
    if DENYLIST.contains(&lowered.as_str()) {
        out.extend(std::iter::repeat('*').take(word.chars().count()));
    } else {
        out.push_str(word);
    }
    word.clear();
}
