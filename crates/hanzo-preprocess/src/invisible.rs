//! Invisible character exposure
//!
//! Zero-width and bidi formatting code points render as nothing, which makes
//! them a cheap way to split or hide words from a classifier. Every occurrence
//! is swapped for a bracketed token so a reader (human or model) sees exactly
//! where it was. Nothing is ever removed.

/// Token used by the canonicalizer for C0/C1 control characters.
pub const CONTROL_TOKEN: &str = "[CTRL]";

/// Fixed mapping from invisible code points to their visible tokens.
const INVISIBLE_TOKENS: &[(char, &str)] = &[
    ('\u{200B}', "[ZWSP]"),
    ('\u{200C}', "[ZWNJ]"),
    ('\u{200D}', "[ZWJ]"),
    ('\u{FEFF}', "[BOM]"),
    ('\u{2060}', "[WJ]"),
    ('\u{200E}', "[LRM]"),
    ('\u{200F}', "[RLM]"),
    ('\u{00AD}', "[SHY]"),
    // Bidi embeddings and overrides
    ('\u{202A}', "[LRE]"),
    ('\u{202B}', "[RLE]"),
    ('\u{202C}', "[PDF]"),
    ('\u{202D}', "[LRO]"),
    ('\u{202E}', "[RLO]"),
    // Bidi isolates
    ('\u{2066}', "[LRI]"),
    ('\u{2067}', "[RLI]"),
    ('\u{2068}', "[FSI]"),
    ('\u{2069}', "[PDI]"),
];

/// The complete token table, in a stable order.
pub fn token_table() -> &'static [(char, &'static str)] {
    INVISIBLE_TOKENS
}

/// Token for a single character, if it is one of the mapped invisibles.
pub fn token_for(c: char) -> Option<&'static str> {
    INVISIBLE_TOKENS
        .iter()
        .find(|(ch, _)| *ch == c)
        .map(|(_, token)| *token)
}

/// Replace every mapped invisible character with its token.
pub fn map_invisible(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match token_for(c) {
            Some(token) => out.push_str(token),
            None => out.push(c),
        }
    }
    out
}

/// Count of mapped invisible characters in `text`.
pub fn count_invisible(text: &str) -> usize {
    text.chars().filter(|c| token_for(*c).is_some()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_width_space() {
        assert_eq!(map_invisible("a\u{200b}b"), "a[ZWSP]b");
    }

    #[test]
    fn test_every_table_entry_maps_to_its_token() {
        for (c, token) in token_table() {
            let input = format!("x{}y", c);
            assert_eq!(map_invisible(&input), format!("x{}y", token), "char U+{:04X}", *c as u32);
        }
    }

    #[test]
    fn test_tokens_are_unique_and_visible() {
        let mut seen = std::collections::HashSet::new();
        for (c, token) in token_table() {
            assert!(seen.insert(*token), "duplicate token {}", token);
            assert!(token.starts_with('[') && token.ends_with(']'));
            assert!(token.chars().all(|t| t.is_ascii_graphic()));
            assert_ne!(token_for(*c), None);
        }
        assert_ne!(CONTROL_TOKEN, "[ZWSP]");
    }

    #[test]
    fn test_every_occurrence_replaced() {
        let input = "\u{feff}ig\u{200d}nore\u{200b}\u{200b} previous";
        let mapped = map_invisible(input);
        assert_eq!(mapped, "[BOM]ig[ZWJ]nore[ZWSP][ZWSP] previous");
        assert_eq!(count_invisible(input), 4);
        assert_eq!(count_invisible(&mapped), 0);
    }

    #[test]
    fn test_other_characters_untouched() {
        let input = "Ünïcödé\ttext\nwith 日本語 and emoji 🚀";
        assert_eq!(map_invisible(input), input);
    }

    #[test]
    fn test_trojan_source_override_is_exposed() {
        let input = "access\u{202e}nimda\u{202c}";
        assert_eq!(map_invisible(input), "access[RLO]nimda[PDF]");
    }
}
