//! # Statement Builder
//!
//! Renders one update statement per entity:
//!
//! ```sql
//! UPDATE <table> SET <column> = '<escaped payload>'::<cast_type> WHERE <key_column> = '<id>';
//! ```
//!
//! The payload is serialized as compact JSON with object keys kept in source
//! order, then every single quote is doubled so the text is a valid string
//! literal. Quote doubling is the only escaping performed; ids are expected
//! to come from a trusted, numeric-like source.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants::template::{
    DEFAULT_CAST_TYPE, DEFAULT_COLUMN, DEFAULT_KEY_COLUMN, DEFAULT_MAX_PAYLOAD_BYTES,
    DEFAULT_TABLE,
};
use crate::error::{BatchError, BatchResult, ValidationError};
use crate::models::{Entity, SkippedEntity, Statement};

/// Double every single quote for embedding in a SQL string literal
pub fn escape_literal(raw: &str) -> String {
    raw.replace('\'', "''")
}

/// Collapse doubled quotes back to single quotes
pub fn unescape_literal(escaped: &str) -> String {
    escaped.replace("''", "'")
}

/// Fixed shape of the rendered update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementTemplate {
    pub table: String,
    pub column: String,
    pub cast_type: String,
    pub key_column: String,
}

impl Default for StatementTemplate {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
            column: DEFAULT_COLUMN.to_string(),
            cast_type: DEFAULT_CAST_TYPE.to_string(),
            key_column: DEFAULT_KEY_COLUMN.to_string(),
        }
    }
}

impl StatementTemplate {
    /// Reject empty identifiers before any statement is rendered
    pub fn validate(&self) -> BatchResult<()> {
        let fields = [
            ("table", &self.table),
            ("column", &self.column),
            ("cast_type", &self.cast_type),
            ("key_column", &self.key_column),
        ];

        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(BatchError::InvalidConfiguration(format!(
                    "statement template field '{name}' must not be empty"
                )));
            }
        }

        Ok(())
    }

    pub fn render(&self, escaped_payload: &str, id: &str) -> String {
        format!(
            "UPDATE {} SET {} = '{}'::{} WHERE {} = '{}';",
            self.table, self.column, escaped_payload, self.cast_type, self.key_column, id
        )
    }
}

/// Statements built from a dataset plus the entities that were skipped
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    pub statements: Vec<Statement>,
    pub skipped: Vec<SkippedEntity>,
}

#[derive(Debug, Clone)]
pub struct StatementBuilder {
    template: StatementTemplate,
    max_payload_bytes: usize,
}

impl Default for StatementBuilder {
    fn default() -> Self {
        Self::new(StatementTemplate::default(), DEFAULT_MAX_PAYLOAD_BYTES)
    }
}

impl StatementBuilder {
    pub fn new(template: StatementTemplate, max_payload_bytes: usize) -> Self {
        Self {
            template,
            max_payload_bytes,
        }
    }

    pub fn template(&self) -> &StatementTemplate {
        &self.template
    }

    /// Render the update statement for one entity
    ///
    /// # Errors
    ///
    /// - `MissingId` when the id is empty
    /// - `EmptyPayload` when there is nothing to write
    /// - `PayloadTooLarge` when the serialized payload exceeds the sanity limit
    pub fn build(&self, entity: &Entity) -> Result<Statement, ValidationError> {
        let id = entity.id.trim();
        if id.is_empty() {
            return Err(ValidationError::MissingId);
        }

        if !entity.has_payload() {
            return Err(ValidationError::EmptyPayload { id: id.to_string() });
        }

        let serialized = serde_json::to_string(&entity.payload)
            .expect("JSON values should always serialize");

        if serialized.len() > self.max_payload_bytes {
            return Err(ValidationError::PayloadTooLarge {
                id: id.to_string(),
                size: serialized.len(),
                limit: self.max_payload_bytes,
            });
        }

        let rendered = self.template.render(&escape_literal(&serialized), &escape_literal(id));
        Ok(Statement::new(id, rendered))
    }

    /// Build statements for every entity, skipping the ones that fail validation
    pub fn build_all<'a, I>(&self, entities: I) -> BuildOutput
    where
        I: IntoIterator<Item = &'a Entity>,
    {
        let mut output = BuildOutput::default();

        for entity in entities {
            match self.build(entity) {
                Ok(statement) => output.statements.push(statement),
                Err(err) => {
                    warn!(
                        entity_id = %entity.id,
                        error = %err,
                        "Skipping entity that failed validation"
                    );
                    output.skipped.push(SkippedEntity {
                        id: entity.id.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        debug!(
            built = output.statements.len(),
            skipped = output.skipped.len(),
            "Rendered update statements"
        );

        output
    }
}
