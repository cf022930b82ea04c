//! # Statement File Reader
//!
//! Reads statements that were rendered earlier, one per line, so that an
//! existing consolidated file (or a batch file that turned out too large for
//! the execution channel) can be partitioned again.
//!
//! Blank lines and `--` comment lines are skipped. Every other line must be a
//! complete statement ending in `WHERE <key_column> = '<id>';`.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

use crate::error::{BatchError, BatchResult};
use crate::models::{Statement, StatementParser};

#[derive(Debug, Clone)]
pub struct StatementFileReader {
    parser: StatementParser,
}

impl StatementFileReader {
    pub fn new(key_column: &str) -> Self {
        Self {
            parser: StatementParser::new(key_column),
        }
    }

    /// Parse statements from any line-oriented reader
    ///
    /// Fails on the first malformed line: a file that cannot be read back
    /// completely must not be partially re-batched.
    pub fn read_from<R: BufRead>(&self, reader: R) -> BatchResult<Vec<Statement>> {
        let mut statements = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| BatchError::io("<statement stream>", e))?;
            let trimmed = line.trim();

            if trimmed.is_empty() || trimmed.starts_with("--") {
                continue;
            }

            statements.push(self.parser.parse(trimmed, index + 1)?);
        }

        Ok(statements)
    }

    /// Parse every statement in `path`
    pub fn read_path(&self, path: impl AsRef<Path>) -> BatchResult<Vec<Statement>> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| BatchError::io(path, e))?;
        let statements = self.read_from(BufReader::new(file))?;

        info!(
            path = %path.display(),
            statements = statements.len(),
            "Read rendered statements"
        );

        Ok(statements)
    }

    /// Parse several files in order, concatenating their statements
    pub fn read_paths<P: AsRef<Path>>(&self, paths: &[P]) -> BatchResult<Vec<Statement>> {
        let mut statements = Vec::new();
        for path in paths {
            statements.extend(self.read_path(path)?);
        }
        Ok(statements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use std::io::Cursor;

    const FILE_BODY: &str = "\
-- generated statements
UPDATE sales SET products = '[1]'::jsonb WHERE ploomes_deal_id = '1';

UPDATE sales SET products = '[\"it''s\"]'::jsonb WHERE ploomes_deal_id = '2';
";

    #[test]
    fn test_reads_statements_skipping_comments_and_blanks() {
        let reader = StatementFileReader::new("ploomes_deal_id");
        let statements = reader.read_from(Cursor::new(FILE_BODY)).unwrap();

        let ids: Vec<&str> = statements.iter().map(|s| s.target_id()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_malformed_line_reports_line_number() {
        let reader = StatementFileReader::new("ploomes_deal_id");
        let body = "UPDATE sales SET products = '[1]'::jsonb WHERE ploomes_deal_id = '1';\n\
                    SELECT 1;\n";

        let err = reader.read_from(Cursor::new(body)).unwrap_err();
        assert!(matches!(
            err,
            BatchError::Validation(ValidationError::MalformedStatement { line: 2 })
        ));
    }

    #[test]
    fn test_read_paths_concatenates_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("batch-001.sql");
        let second = dir.path().join("batch-002.sql");
        std::fs::write(
            &first,
            "UPDATE sales SET products = '[1]'::jsonb WHERE ploomes_deal_id = '10';",
        )
        .unwrap();
        std::fs::write(
            &second,
            "UPDATE sales SET products = '[2]'::jsonb WHERE ploomes_deal_id = '20';\n",
        )
        .unwrap();

        let reader = StatementFileReader::new("ploomes_deal_id");
        let statements = reader.read_paths(&[first, second]).unwrap();

        let ids: Vec<&str> = statements.iter().map(|s| s.target_id()).collect();
        assert_eq!(ids, vec!["10", "20"]);
    }
}
