//! Splitting of scope parameter strings into ordered scope token lists.

/// Splits a raw `scope` parameter into an ordered list of scope tokens.
///
/// A parser is configured with one or more separator characters which are tried in order: the
/// first separator that actually occurs in the input wins and splits it. This allows a single
/// configuration to accept several delimiter conventions, e.g. both the space mandated by the
/// rfc and the comma used by some legacy clients. A value containing no configured separator is
/// a single scope token.
///
/// Empty tokens are dropped, first-occurrence order is preserved. Parsing is idempotent under
/// re-joining with the winning separator.
#[derive(Clone, Debug)]
pub struct ScopeParser {
    separators: Vec<char>,
}

impl ScopeParser {
    /// A parser with a custom separator list, tried in the given order.
    ///
    /// An empty list falls back to the default space separator.
    pub fn new(separators: &[char]) -> Self {
        if separators.is_empty() {
            return ScopeParser::default();
        }
        ScopeParser {
            separators: separators.to_vec(),
        }
    }

    /// Split a raw scope value into its tokens.
    pub fn parse(&self, raw: &str) -> Vec<String> {
        if raw.is_empty() {
            return Vec::new();
        }

        for &separator in &self.separators {
            if raw.contains(separator) {
                return raw
                    .split(separator)
                    .filter(|token| !token.is_empty())
                    .map(str::to_string)
                    .collect();
            }
        }

        vec![raw.to_string()]
    }
}

impl Default for ScopeParser {
    /// The rfc6749 default, a single space separator.
    fn default() -> Self {
        ScopeParser { separators: vec![' '] }
    }
}
