//! # Discrepancy Finder
//!
//! The only place partial application failure is detected. Ids that were
//! submitted but still read back empty are failures; their statements are
//! regenerated in original order and can be partitioned again.

use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{info, warn};

use super::snapshot::AuthoritativeReader;
use crate::error::{BatchError, BatchResult};
use crate::ingestion::{escape_literal, StatementTemplate};
use crate::models::Statement;

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub submitted_count: usize,
    pub failed_ids: BTreeSet<String>,
    /// Still empty but never submitted; reported, never resubmitted
    pub unexpected_ids: BTreeSet<String>,
    #[serde(skip)]
    pub resubmit: Vec<Statement>,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.failed_ids.is_empty()
    }
}

#[derive(Debug)]
pub struct DiscrepancyFinder;

impl DiscrepancyFinder {
    /// `submitted ∩ still_empty`
    pub fn find_failed(
        submitted: &BTreeSet<String>,
        still_empty: &BTreeSet<String>,
    ) -> BTreeSet<String> {
        submitted.intersection(still_empty).cloned().collect()
    }

    /// Statements whose target is in `failed`, in their original order
    pub fn regenerate(statements: &[Statement], failed: &BTreeSet<String>) -> Vec<Statement> {
        statements
            .iter()
            .filter(|statement| failed.contains(statement.target_id()))
            .cloned()
            .collect()
    }

    pub fn reconcile(
        statements: &[Statement],
        reader: &dyn AuthoritativeReader,
    ) -> BatchResult<ReconciliationReport> {
        let submitted: BTreeSet<String> = statements
            .iter()
            .map(|statement| statement.target_id().to_string())
            .collect();

        let still_empty = reader.still_empty(&submitted)?;
        let failed_ids = Self::find_failed(&submitted, &still_empty);
        let unexpected_ids: BTreeSet<String> =
            still_empty.difference(&submitted).cloned().collect();
        let resubmit = Self::regenerate(statements, &failed_ids);

        if !unexpected_ids.is_empty() {
            warn!(
                count = unexpected_ids.len(),
                sample = ?unexpected_ids.iter().take(5).collect::<Vec<_>>(),
                "Still-empty ids that were never submitted"
            );
        }

        info!(
            submitted = submitted.len(),
            failed = failed_ids.len(),
            unexpected = unexpected_ids.len(),
            resubmit = resubmit.len(),
            "🔍 RECONCILIATION: Compared submitted ids against authoritative read"
        );

        Ok(ReconciliationReport {
            submitted_count: submitted.len(),
            failed_ids,
            unexpected_ids,
            resubmit,
        })
    }
}

/// Render the authoritative read for an operator to run remotely
///
/// The result set is the still-empty ids, ready to feed back as a snapshot.
pub fn lookup_query<'a, I>(template: &StatementTemplate, ids: I) -> BatchResult<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let literals: Vec<String> = ids
        .into_iter()
        .map(|id| format!("'{}'", escape_literal(id)))
        .collect();

    if literals.is_empty() {
        return Err(BatchError::Reconciliation(
            "cannot build a lookup query without ids".to_string(),
        ));
    }

    let length_fn = if template.cast_type.eq_ignore_ascii_case("json") {
        "json_array_length"
    } else {
        "jsonb_array_length"
    };

    Ok(format!(
        "SELECT {key} FROM {table} WHERE {key} IN ({ids}) \
         AND ({column} IS NULL OR {length_fn}({column}) = 0);",
        key = template.key_column,
        table = template.table,
        column = template.column,
        ids = literals.join(", "),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciliation::StillEmptySnapshot;

    fn ids(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn statement(id: &str) -> Statement {
        Statement::new(
            id,
            format!("UPDATE sales SET products = '[]'::jsonb WHERE ploomes_deal_id = '{id}';"),
        )
    }

    #[test]
    fn test_find_failed_is_intersection() {
        let failed = DiscrepancyFinder::find_failed(&ids(&["1", "2", "3"]), &ids(&["2", "3", "4"]));
        assert_eq!(failed, ids(&["2", "3"]));
    }

    #[test]
    fn test_regenerate_keeps_original_order() {
        let statements: Vec<Statement> =
            ["5", "3", "9", "1"].iter().map(|id| statement(id)).collect();
        let resubmit = DiscrepancyFinder::regenerate(&statements, &ids(&["1", "5"]));

        let order: Vec<&str> = resubmit.iter().map(Statement::target_id).collect();
        assert_eq!(order, vec!["5", "1"]);
    }

    #[test]
    fn test_reconcile_reports_unexpected_ids() {
        let statements: Vec<Statement> = ["1", "2", "3"].iter().map(|id| statement(id)).collect();
        let snapshot = StillEmptySnapshot::new(["2", "3", "4"]);

        let report = DiscrepancyFinder::reconcile(&statements, &snapshot).unwrap();

        assert_eq!(report.submitted_count, 3);
        assert_eq!(report.failed_ids, ids(&["2", "3"]));
        assert_eq!(report.unexpected_ids, ids(&["4"]));
        assert_eq!(report.resubmit.len(), 2);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_clean_reconciliation() {
        let statements = vec![statement("1")];
        let report =
            DiscrepancyFinder::reconcile(&statements, &StillEmptySnapshot::default()).unwrap();
        assert!(report.is_clean());
        assert!(report.resubmit.is_empty());
    }

    #[test]
    fn test_lookup_query_escapes_ids() {
        let query = lookup_query(&StatementTemplate::default(), ["42", "O'Brien"]).unwrap();
        assert_eq!(
            query,
            "SELECT ploomes_deal_id FROM sales WHERE ploomes_deal_id IN ('42', 'O''Brien') \
             AND (products IS NULL OR jsonb_array_length(products) = 0);"
        );
    }

    #[test]
    fn test_lookup_query_matches_json_cast() {
        let template = StatementTemplate {
            cast_type: "json".to_string(),
            ..StatementTemplate::default()
        };
        let query = lookup_query(&template, ["5"]).unwrap();

        assert!(query.contains("json_array_length(products)"));
        assert!(!query.contains("jsonb_array_length"));
    }

    #[test]
    fn test_lookup_query_requires_ids() {
        let err = lookup_query(&StatementTemplate::default(), std::iter::empty()).unwrap_err();
        assert!(matches!(err, BatchError::Reconciliation(_)));
    }
}
