//! Brace expansion across backends.
//!
//! A pattern may contain a single `{alt1,alt2,...}` group. Each alternative
//! is substituted in turn, so one pattern can name paths on different
//! backends:
//!
//! ```rust
//! use smartfs::expand;
//!
//! let paths = expand("{/a,s3://bucket/key}/filename").unwrap();
//! assert_eq!(paths, vec!["/a/filename", "s3://bucket/key/filename"]);
//! ```
//!
//! `\{`, `\}`, `\,` and `\\` stand for the literal character. Any other
//! backslash is kept as is.

use crate::SmartError;

#[derive(Clone, Copy)]
enum State {
    Before,
    Inside,
    After,
}

/// Expand the brace group of `pattern` into concrete paths, in order.
///
/// A pattern without a group expands to itself.
///
/// # Errors
///
/// - [`SmartError::InvalidPattern`] for nested, repeated, unclosed,
///   unmatched or empty groups
pub fn expand(pattern: &str) -> Result<Vec<String>, SmartError> {
    let invalid = |reason: &str| SmartError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    };

    let mut state = State::Before;
    let mut prefix = String::new();
    let mut alternatives: Vec<String> = Vec::new();
    let mut suffix = String::new();

    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        let escaped = c == '\\' && matches!(chars.peek(), Some('{' | '}' | ',' | '\\'));
        let c = if escaped {
            // peek() just matched, so next() is Some.
            chars.next().unwrap_or(c)
        } else {
            c
        };

        let target = match (state, escaped, c) {
            (State::Before, false, '{') => {
                state = State::Inside;
                alternatives.push(String::new());
                continue;
            }
            (State::Inside, false, '{') => return Err(invalid("nested brace groups")),
            (State::After, false, '{') => return Err(invalid("more than one brace group")),
            (State::Inside, false, '}') => {
                if alternatives.len() == 1 && alternatives[0].is_empty() {
                    return Err(invalid("empty brace group"));
                }
                state = State::After;
                continue;
            }
            (_, false, '}') => return Err(invalid("unmatched '}'")),
            (State::Inside, false, ',') => {
                alternatives.push(String::new());
                continue;
            }
            (State::Before, _, _) => &mut prefix,
            (State::After, _, _) => &mut suffix,
            (State::Inside, _, _) => match alternatives.last_mut() {
                Some(alt) => alt,
                None => return Err(invalid("brace group without alternatives")),
            },
        };
        target.push(c);
    }

    match state {
        State::Before => Ok(vec![prefix]),
        State::Inside => Err(invalid("unclosed '{'")),
        State::After => Ok(alternatives
            .into_iter()
            .map(|alt| format!("{prefix}{alt}{suffix}"))
            .collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(pattern: &str) -> String {
        match expand(pattern) {
            Err(SmartError::InvalidPattern { reason, .. }) => reason,
            other => panic!("{pattern:?} should be invalid, got {other:?}"),
        }
    }

    #[test]
    fn expands_across_schemes_in_order() {
        assert_eq!(
            expand("{/a,s3://bucket/key}/filename").unwrap(),
            vec!["/a/filename", "s3://bucket/key/filename"]
        );
    }

    #[test]
    fn no_group_is_identity() {
        assert_eq!(expand("/tmp/*.txt").unwrap(), vec!["/tmp/*.txt"]);
        assert_eq!(expand("").unwrap(), vec![""]);
    }

    #[test]
    fn group_in_the_middle() {
        assert_eq!(
            expand("s3://b/{x,y,}/f").unwrap(),
            vec!["s3://b/x/f", "s3://b/y/f", "s3://b//f"]
        );
    }

    #[test]
    fn escapes_are_literal() {
        assert_eq!(expand(r"/a\{b\}").unwrap(), vec!["/a{b}"]);
        assert_eq!(expand(r"{a\,b,c}").unwrap(), vec!["a,b", "c"]);
        assert_eq!(expand(r"/a\\b").unwrap(), vec![r"/a\b"]);
        assert_eq!(expand(r"/a\nb").unwrap(), vec![r"/a\nb"]);
    }

    #[test]
    fn malformed_groups_are_rejected() {
        assert_eq!(reason("{a,{b}}"), "nested brace groups");
        assert_eq!(reason("{a,b}/{c,d}"), "more than one brace group");
        assert_eq!(reason("{a,b"), "unclosed '{'");
        assert_eq!(reason("a}"), "unmatched '}'");
        assert_eq!(reason("x{}y"), "empty brace group");
    }
}
