//! # Statement
//!
//! One fully rendered update for a single entity, plus the parser that
//! recovers a `Statement` from text that was rendered earlier.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A rendered, escaped update statement
///
/// Immutable once built. `size_bytes` is the UTF-8 length of the rendered
/// text and is what the size-bounded partitioner budgets against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    target_id: String,
    rendered_text: String,
    size_bytes: usize,
}

impl Statement {
    pub fn new(target_id: impl Into<String>, rendered_text: impl Into<String>) -> Self {
        let rendered_text = rendered_text.into();
        let size_bytes = rendered_text.len();
        Self {
            target_id: target_id.into(),
            rendered_text,
            size_bytes,
        }
    }

    /// Parse a previously rendered statement, recovering its target id
    ///
    /// Prefer [`StatementParser`] when parsing many lines; this builds a new
    /// parser per call.
    pub fn from_rendered(text: &str, key_column: &str) -> Result<Self, ValidationError> {
        StatementParser::new(key_column).parse(text, 1)
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn rendered_text(&self) -> &str {
        &self.rendered_text
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }
}

/// Extracts the target id from `... WHERE <key_column> = '<id>';`
#[derive(Debug, Clone)]
pub struct StatementParser {
    pattern: Regex,
}

impl StatementParser {
    pub fn new(key_column: &str) -> Self {
        let pattern = format!(
            r"(?i)\bWHERE\s+{}\s*=\s*'((?:[^']|'')*)'\s*;\s*$",
            regex::escape(key_column)
        );
        let pattern = Regex::new(&pattern)
            .expect("escaped key column should always form a valid pattern");
        Self { pattern }
    }

    /// Parse one statement; `line` is only used for error reporting
    pub fn parse(&self, text: &str, line: usize) -> Result<Statement, ValidationError> {
        let text = text.trim();
        let target_id = self
            .pattern
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|id| id.as_str().replace("''", "'"))
            .filter(|id| !id.is_empty())
            .ok_or(ValidationError::MalformedStatement { line })?;

        Ok(Statement::new(target_id, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RENDERED: &str =
        r#"UPDATE sales SET products = '[{"name":"O''Brien"}]'::jsonb WHERE ploomes_deal_id = '9001';"#;

    #[test]
    fn test_size_is_byte_length() {
        let statement = Statement::new("1", "UPDATE t SET c = 'ç';");
        assert_eq!(statement.size_bytes(), "UPDATE t SET c = 'ç';".len());
        assert_eq!(statement.size_bytes(), 22);
    }

    #[test]
    fn test_from_rendered_extracts_target_id() {
        let statement = Statement::from_rendered(RENDERED, "ploomes_deal_id").unwrap();
        assert_eq!(statement.target_id(), "9001");
        assert_eq!(statement.rendered_text(), RENDERED);
        assert_eq!(statement.size_bytes(), RENDERED.len());
    }

    #[test]
    fn test_from_rendered_trims_surrounding_whitespace() {
        let padded = format!("   {RENDERED}  \n");
        let statement = Statement::from_rendered(&padded, "ploomes_deal_id").unwrap();
        assert_eq!(statement.rendered_text(), RENDERED);
    }

    #[test]
    fn test_parser_rejects_other_key_column() {
        let err = StatementParser::new("deal_id").parse(RENDERED, 7).unwrap_err();
        assert_eq!(err, ValidationError::MalformedStatement { line: 7 });
    }

    #[test]
    fn test_parser_rejects_missing_terminator() {
        let unterminated = RENDERED.trim_end_matches(';');
        assert!(Statement::from_rendered(unterminated, "ploomes_deal_id").is_err());
    }
}
