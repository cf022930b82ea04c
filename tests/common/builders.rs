//! Test data builders for datasets and rendered statements

use serde_json::{json, Value};
use std::path::{Path, PathBuf};

use deal_batch_core::{Entity, Statement};

/// A deal with `product_count` product records
pub fn deal(id: &str, product_count: usize) -> Entity {
    let products = (0..product_count)
        .map(|n| {
            json!({"product_name": format!("Item {n}"), "quantity": n + 1, "unit_price": 10.5})
        })
        .collect();
    Entity::new(id, products)
}

/// Rendered statement padded to exactly `size_bytes` when possible
///
/// Sizes smaller than the fixed statement shape come out at the minimum.
pub fn statement_of_size(id: &str, size_bytes: usize) -> Statement {
    let head = "UPDATE sales SET products = '";
    let tail = format!("'::jsonb WHERE ploomes_deal_id = '{id}';");
    let padding = size_bytes.saturating_sub(head.len() + tail.len());
    Statement::new(id, format!("{head}{}{tail}", "x".repeat(padding)))
}

/// One statement per size, ids `1..=n`
pub fn statements_with_sizes(sizes: &[usize]) -> Vec<Statement> {
    sizes
        .iter()
        .enumerate()
        .map(|(i, size)| statement_of_size(&(i + 1).to_string(), *size))
        .collect()
}

/// `count` small statements, ids `1..=count`
pub fn statements(count: usize) -> Vec<Statement> {
    statements_with_sizes(&vec![100; count])
}

/// Builds a dataset file in the shape the upstream export uses
#[derive(Debug, Default)]
pub struct DatasetBuilder {
    records: Vec<Value>,
}

impl DatasetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Numeric `Id`, `Products` array, plus an unrelated field
    pub fn with_deal(mut self, id: u64, products: Vec<Value>) -> Self {
        self.records.push(json!({
            "Id": id,
            "Title": format!("Deal {id}"),
            "Products": products,
        }));
        self
    }

    pub fn with_deal_without_products(mut self, id: u64) -> Self {
        self.records.push(json!({ "Id": id, "Title": "No products", "Products": null }));
        self
    }

    pub fn with_raw(mut self, record: Value) -> Self {
        self.records.push(record);
        self
    }

    pub fn write_to(self, dir: &Path) -> PathBuf {
        let path = dir.join("deals.json");
        std::fs::write(&path, serde_json::to_string_pretty(&self.records).unwrap()).unwrap();
        path
    }
}

/// Sorted file names in `dir`
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
