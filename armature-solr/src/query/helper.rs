//! Escaping of user input for the Lucene/Solr query syntax.

/// Characters that carry meaning in the standard query parser.
const RESERVED: &[char] = &[
    '+', '-', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '\\', '/',
];

/// Escape a single term so every character is matched literally.
///
/// Escapes `+ - && || ! ( ) { } [ ] ^ " ~ * ? : \ /` and whitespace.
///
/// ```rust
/// use armature_solr::escape_term;
///
/// assert_eq!(escape_term("a+b"), r"a\+b");
/// assert_eq!(escape_term("rock && roll"), r"rock\ \&&\ roll");
/// ```
pub fn escape_term(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 8);
    let mut chars = term.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '&' | '|' if chars.peek() == Some(&c) => {
                chars.next();
                escaped.push('\\');
                escaped.push(c);
                escaped.push(c);
            }
            c if RESERVED.contains(&c) || c.is_whitespace() => {
                escaped.push('\\');
                escaped.push(c);
            }
            c => escaped.push(c),
        }
    }

    escaped
}

/// Quote a phrase, escaping only what would end the quotes early.
pub fn escape_phrase(phrase: &str) -> String {
    let mut escaped = String::with_capacity(phrase.len() + 2);
    escaped.push('"');
    for c in phrase.chars() {
        if c == '"' || c == '\\' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('"');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_term_untouched() {
        assert_eq!(escape_term("solr2014"), "solr2014");
        assert_eq!(escape_term("große"), "große");
    }

    #[test]
    fn test_every_reserved_character() {
        for c in RESERVED {
            let input = format!("a{}b", c);
            assert_eq!(escape_term(&input), format!("a\\{}b", c), "char {:?}", c);
        }
    }

    #[test]
    fn test_boolean_operators() {
        assert_eq!(escape_term("a&&b"), r"a\&&b");
        assert_eq!(escape_term("a||b"), r"a\||b");
        assert_eq!(escape_term("a&b|c"), "a&b|c");
    }

    #[test]
    fn test_whitespace() {
        assert_eq!(escape_term("hello world"), r"hello\ world");
        assert_eq!(escape_term("tab\there"), "tab\\\there");
    }

    #[test]
    fn test_escape_phrase() {
        assert_eq!(escape_phrase(r#"say "hi""#), r#""say \"hi\"""#);
        assert_eq!(escape_phrase("a+b"), r#""a+b""#);
    }
}
