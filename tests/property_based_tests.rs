mod common;

use common::strategies::*;
use proptest::prelude::*;

use deal_batch_core::ingestion::{escape_literal, unescape_literal};
use deal_batch_core::{
    BatchPartitioner, Entity, ExecutionCursor, InMemoryCursorStore, PartitionStrategy, Statement,
    StatementBuilder,
};

fn flatten<'a>(batches: &[deal_batch_core::Batch<'a>]) -> Vec<&'a Statement> {
    batches.iter().flat_map(|b| b.statements.iter()).collect()
}

proptest! {
    /// Property: concatenating batches in order reproduces the input, under either strategy
    #[test]
    fn partition_is_complete_and_ordered(
        statements in statements_strategy(),
        batch_size in 1usize..15,
        max_bytes in 1_000usize..20_000,
    ) {
        for strategy in [
            PartitionStrategy::FixedCount { batch_size },
            PartitionStrategy::SizeBounded { max_bytes },
        ] {
            let batches = BatchPartitioner::new(strategy).unwrap().partition(&statements);
            prop_assert_eq!(flatten(&batches), statements.iter().collect::<Vec<_>>());
            prop_assert!(batches.iter().all(|b| !b.is_empty()));

            let indexes: Vec<usize> = batches.iter().map(|b| b.index).collect();
            prop_assert_eq!(indexes, (1..=batches.len()).collect::<Vec<_>>());
        }
    }

    /// Property: a size-bounded batch exceeds the budget only as an oversize singleton
    #[test]
    fn size_bounded_batches_respect_budget(
        statements in statements_strategy(),
        max_bytes in 1_000usize..20_000,
    ) {
        let partitioner =
            BatchPartitioner::new(PartitionStrategy::SizeBounded { max_bytes }).unwrap();
        for batch in partitioner.partition(&statements) {
            let total: usize = batch.statements.iter().map(Statement::size_bytes).sum();
            prop_assert_eq!(total, batch.total_size_bytes);
            prop_assert!(total <= max_bytes || batch.statement_count() == 1);
        }
    }

    /// Property: no size-bounded batch could have taken the next batch's first statement
    #[test]
    fn size_bounded_batches_are_maximal(
        statements in statements_strategy(),
        max_bytes in 1_000usize..20_000,
    ) {
        let partitioner =
            BatchPartitioner::new(PartitionStrategy::SizeBounded { max_bytes }).unwrap();
        let batches = partitioner.partition(&statements);
        for pair in batches.windows(2) {
            let next_first = pair[1].statements[0].size_bytes();
            prop_assert!(pair[0].total_size_bytes + next_first > max_bytes);
        }
    }

    /// Property: escaping then collapsing quotes recovers the original text
    #[test]
    fn escaping_round_trips(text in payload_text_strategy()) {
        let escaped = escape_literal(&text);
        prop_assert_eq!(escaped.matches('\'').count(), text.matches('\'').count() * 2);
        prop_assert_eq!(unescape_literal(&escaped), text);
    }

    /// Property: a rendered statement parses back to its entity's id
    #[test]
    fn rendered_statements_parse_back(
        id in awkward_id_strategy(),
        products in products_strategy(),
    ) {
        let statement = StatementBuilder::default()
            .build(&Entity::new(id.clone(), products))
            .unwrap();
        let parsed =
            Statement::from_rendered(statement.rendered_text(), "ploomes_deal_id").unwrap();
        prop_assert_eq!(parsed.target_id(), id.trim());
        prop_assert_eq!(parsed, statement);
    }

    /// Property: advancing the cursor visits every statement exactly once
    #[test]
    fn cursor_windows_cover_input_once(total in 0usize..80, window_size in 1usize..12) {
        let items: Vec<usize> = (0..total).collect();
        let cursor = ExecutionCursor::initialize(InMemoryCursorStore::new(), total, false).unwrap();

        let mut visited = Vec::new();
        loop {
            let window = cursor.advance(&items, window_size).unwrap();
            if window.exhausted {
                break;
            }
            prop_assert!(window.len() <= window_size);
            visited.extend_from_slice(window.items);
        }
        prop_assert_eq!(visited, items);
    }
}
