//! File-name glob matching.
//!
//! Patterns follow shell/fnmatch conventions (`*`, `?`, `[abc]`, `[!abc]`)
//! and are matched against a single file name, never a full path.
//! Matching is case-sensitive on every platform. Braces are literal
//! characters, not alternation.

use globset::{GlobBuilder, GlobMatcher};

use crate::error::NasError;

/// Pattern matching every file.
pub const MATCH_ALL: &str = "*";

/// A compiled file-name pattern.
#[derive(Debug, Clone)]
pub struct FilePattern {
    source: String,
    matcher: GlobMatcher,
}

impl FilePattern {
    /// Compile a glob pattern.
    pub fn new(pattern: &str) -> Result<Self, NasError> {
        let glob = GlobBuilder::new(&escape_braces(pattern))
            .case_insensitive(false)
            .literal_separator(false)
            .backslash_escape(false)
            .build()
            .map_err(|e| NasError::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.kind().to_string(),
            })?;

        Ok(Self {
            source: pattern.to_string(),
            matcher: glob.compile_matcher(),
        })
    }

    /// Pattern accepting every file name.
    pub fn match_all() -> Self {
        Self::new(MATCH_ALL).expect("'*' is a valid glob")
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether `file_name` matches the pattern.
    pub fn matches(&self, file_name: &str) -> bool {
        self.matcher.is_match(file_name)
    }
}

/// Wrap `{` and `}` outside character classes in single-character classes.
fn escape_braces(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    let mut in_class = false;

    while let Some(c) = chars.next() {
        if in_class {
            out.push(c);
            if c == ']' {
                in_class = false;
            }
            continue;
        }
        match c {
            '{' => out.push_str("[{]"),
            '}' => out.push_str("[}]"),
            '[' => {
                in_class = true;
                out.push('[');
                // A leading negation and a leading `]` belong to the class.
                if let Some(&neg) = chars.peek() {
                    if neg == '!' || neg == '^' {
                        out.push(neg);
                        chars.next();
                    }
                }
                if chars.peek() == Some(&']') {
                    out.push(']');
                    chars.next();
                }
            }
            _ => out.push(c),
        }
    }
    out
}

impl Default for FilePattern {
    fn default() -> Self {
        Self::match_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_matches_everything() {
        let pattern = FilePattern::match_all();
        assert!(pattern.matches("report.txt"));
        assert!(pattern.matches(".hidden"));
        assert!(pattern.matches("no_extension"));
    }

    #[test]
    fn test_extension_pattern() {
        let pattern = FilePattern::new("*.txt").unwrap();
        assert!(pattern.matches("file1.txt"));
        assert!(!pattern.matches("file3.log"));
        assert!(!pattern.matches("file.txt.bak"));
    }

    #[test]
    fn test_case_sensitive() {
        let pattern = FilePattern::new("*.TXT").unwrap();
        assert!(!pattern.matches("x.txt"));
        assert!(pattern.matches("x.TXT"));
    }

    #[test]
    fn test_fnmatch_classes() {
        let pattern = FilePattern::new("log_[0-9]?.csv").unwrap();
        assert!(pattern.matches("log_1a.csv"));
        assert!(!pattern.matches("log_x1.csv"));

        let negated = FilePattern::new("[!_]*").unwrap();
        assert!(negated.matches("data.json"));
        assert!(!negated.matches("_draft.json"));
    }

    #[test]
    fn test_braces_are_literal() {
        let pattern = FilePattern::new("notes{1,2}.txt").unwrap();
        assert!(pattern.matches("notes{1,2}.txt"));
        assert!(!pattern.matches("notes1.txt"));
        assert!(!pattern.matches("notes2.txt"));
        assert_eq!(pattern.as_str(), "notes{1,2}.txt");

        let unbalanced = FilePattern::new("a{b").unwrap();
        assert!(unbalanced.matches("a{b"));
        assert!(FilePattern::new("x}*").unwrap().matches("x}.log"));
    }

    #[test]
    fn test_braces_inside_class() {
        let pattern = FilePattern::new("[{}]*").unwrap();
        assert!(pattern.matches("{draft}"));
        assert!(pattern.matches("}end"));
        assert!(!pattern.matches("plain"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = FilePattern::new("[unclosed").unwrap_err();
        assert!(matches!(err, NasError::InvalidPattern { .. }));
        assert!(err.to_string().contains("[unclosed"));
    }
}
