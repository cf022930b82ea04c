use proptest::prelude::*;
use serde_json::Value;

use super::builders::statements_with_sizes;
use deal_batch_core::Statement;

/// Ordered statements with sizes spread around a 10k budget
pub fn statements_strategy() -> impl Strategy<Value = Vec<Statement>> {
    prop::collection::vec(80usize..12_000, 0..60).prop_map(|sizes| statements_with_sizes(&sizes))
}

/// Ids that include quotes and other characters needing escape
pub fn awkward_id_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9' -]{1,24}".prop_filter("non-blank id", |id| !id.trim().is_empty())
}

/// Free text that mixes quotes, unicode and backslashes
pub fn payload_text_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 '\"\\\\çãé]{0,40}"
}

/// Product records carrying the free text
pub fn products_strategy() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec(
        (payload_text_strategy(), 1u32..50).prop_map(|(name, quantity)| {
            serde_json::json!({"product_name": name, "quantity": quantity})
        }),
        1..5,
    )
}
