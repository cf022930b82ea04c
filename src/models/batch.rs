//! # Batch
//!
//! A contiguous, ordered group of statements sized for one trip through the
//! execution channel.

use serde::Serialize;

use super::statement::Statement;

/// One partition of the statement sequence
///
/// Batches borrow their statements as a slice of the full, ordered statement
/// list, so partitioning never copies rendered text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch<'a> {
    /// 1-based, contiguous across a partitioning run
    pub index: usize,
    pub statements: &'a [Statement],
    pub total_size_bytes: usize,
}

impl<'a> Batch<'a> {
    pub fn new(index: usize, statements: &'a [Statement]) -> Self {
        let total_size_bytes = statements.iter().map(Statement::size_bytes).sum();
        Self {
            index,
            statements,
            total_size_bytes,
        }
    }

    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Target ids in statement order
    pub fn target_ids(&self) -> impl Iterator<Item = &'a str> + 'a {
        self.statements.iter().map(Statement::target_id)
    }

    /// Rendered batch file body: statement texts joined by `separator`
    pub fn render(&self, separator: &str) -> String {
        self.statements
            .iter()
            .map(Statement::rendered_text)
            .collect::<Vec<_>>()
            .join(separator)
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            index: self.index,
            statement_count: self.statement_count(),
            total_size_bytes: self.total_size_bytes,
        }
    }
}

/// Owned observability record for a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub index: usize,
    pub statement_count: usize,
    pub total_size_bytes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_totals_and_render() {
        let statements = vec![
            Statement::new("1", "UPDATE a;"),
            Statement::new("2", "UPDATE bb;"),
        ];
        let batch = Batch::new(1, &statements);

        assert_eq!(batch.statement_count(), 2);
        assert_eq!(batch.total_size_bytes, 19);
        assert_eq!(batch.render("\n"), "UPDATE a;\nUPDATE bb;");
        assert_eq!(batch.target_ids().collect::<Vec<_>>(), vec!["1", "2"]);
        assert_eq!(
            batch.summary(),
            BatchSummary {
                index: 1,
                statement_count: 2,
                total_size_bytes: 19
            }
        );
    }
}
