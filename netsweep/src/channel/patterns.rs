//! Prompt patterns shared by every dialect.

use std::sync::LazyLock;

use regex::bytes::Regex;

/// Any plausible CLI prompt: a short line ending in `>`, `#`, `$` or `%`.
///
/// Used before the dialect is known (autodetection, first read after login).
pub static GENERIC_PROMPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\n]{0,80}[>#$%]\s?$").unwrap());

/// Pager prompts that stop output until a key is pressed.
pub static PAGER_PROMPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(--\s?more\s?--|<--- more --->|\(more\)|press any key to continue)\s*$")
        .unwrap()
});

/// Combine several prompt regexes into one alternation.
pub fn combine(patterns: impl IntoIterator<Item = impl AsRef<str>>) -> Result<Regex, regex::Error> {
    let joined = patterns
        .into_iter()
        .map(|p| format!("(?:{})", p.as_ref()))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_prompt() {
        assert!(GENERIC_PROMPT.is_match(b"router>"));
        assert!(GENERIC_PROMPT.is_match(b"router# "));
        assert!(GENERIC_PROMPT.is_match(b"user@host:~$ "));
        assert!(GENERIC_PROMPT.is_match(b"root@fw:RE:0%"));
        assert!(!GENERIC_PROMPT.is_match(b"Password:"));
    }

    #[test]
    fn test_pager_prompt() {
        assert!(PAGER_PROMPT.is_match(b" --More-- "));
        assert!(PAGER_PROMPT.is_match(b"---(more)"));
        assert!(!PAGER_PROMPT.is_match(b"router#"));
    }

    #[test]
    fn test_combine() {
        let combined = combine([r">\s*$", r"#\s*$"]).unwrap();
        assert!(combined.is_match(b"sw1>"));
        assert!(combined.is_match(b"sw1#"));
        assert!(!combined.is_match(b"sw1$"));
    }
}
