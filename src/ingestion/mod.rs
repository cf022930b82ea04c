//! Ingestion: dataset loading, statement rendering, and reading rendered
//! statement files back in.

pub mod loader;
pub mod statement_builder;
pub mod statement_reader;

pub use loader::{DealLoader, LoadReport};
pub use statement_builder::{
    escape_literal, unescape_literal, BuildOutput, StatementBuilder, StatementTemplate,
};
pub use statement_reader::StatementFileReader;
