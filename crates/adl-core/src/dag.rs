//! Block dependency ordering
//!
//! Object blocks may take from, or refer to, other object blocks; cut blocks
//! may select on other cuts. Emission must place producers before consumers.
//!
//! The order is a fixed-point closure:
//! - blocks without sibling references come first, in source order
//! - then repeated passes over the rest (source order), each block moving
//!   as soon as everything it references has moved
//! - anything left after `n` passes is part of a cycle and is reported

use std::collections::BTreeSet;

use tracing::debug;

use crate::ast::{Block, BlockKind};
use crate::error::{CompileError, Result};
use crate::lexer::identifiers;

/// A block together with the sibling blocks it references
#[derive(Debug, Clone)]
pub struct BlockDeps<'d> {
    pub block: &'d Block,
    pub depends_on: BTreeSet<String>,
}

/// Names from `siblings` referenced anywhere in the block body, self excluded.
pub fn sibling_references(block: &Block, siblings: &BTreeSet<&str>) -> BTreeSet<String> {
    block
        .body
        .iter()
        .flat_map(|stmt| identifiers(&stmt.operand))
        .filter(|word| *word != block.name && siblings.contains(word))
        .map(str::to_string)
        .collect()
}

/// Compute dependencies for every block of one kind
pub fn dependencies<'d>(blocks: &[&'d Block]) -> Vec<BlockDeps<'d>> {
    let siblings: BTreeSet<&str> = blocks.iter().map(|b| b.name.as_str()).collect();
    blocks
        .iter()
        .map(|&block| BlockDeps {
            block,
            depends_on: sibling_references(block, &siblings),
        })
        .collect()
}

/// Order blocks so that every block follows the blocks it depends on.
///
/// Blocks with no relationship keep their source order.
pub fn dependency_order<'d>(
    kind: BlockKind,
    nodes: Vec<BlockDeps<'d>>,
) -> Result<Vec<&'d Block>> {
    let total = nodes.len();
    let mut resolved: BTreeSet<&str> = BTreeSet::new();
    let mut ordered: Vec<&'d Block> = Vec::with_capacity(total);

    // 1) blocks with no internal dependencies
    let mut pending: Vec<BlockDeps<'d>> = Vec::new();
    for node in nodes {
        if node.depends_on.is_empty() {
            resolved.insert(node.block.name.as_str());
            ordered.push(node.block);
        } else {
            pending.push(node);
        }
    }

    // 2) move dependent blocks once their producers are placed
    for _ in 0..total {
        if pending.is_empty() {
            break;
        }
        let mut still_pending = Vec::new();
        for node in pending {
            if node.depends_on.iter().all(|dep| resolved.contains(dep.as_str())) {
                resolved.insert(node.block.name.as_str());
                ordered.push(node.block);
            } else {
                still_pending.push(node);
            }
        }
        pending = still_pending;
    }

    if !pending.is_empty() {
        return Err(CompileError::CircularDependency {
            kind,
            blocks: pending.iter().map(|n| n.block.name.clone()).collect(),
        });
    }

    debug!(
        kind = %kind,
        order = ?ordered.iter().map(|b| b.name.as_str()).collect::<Vec<_>>(),
        "dependency order"
    );
    Ok(ordered)
}

/// Convenience: dependencies and order for all blocks of `kind`
pub fn order_blocks<'d>(kind: BlockKind, blocks: &[&'d Block]) -> Result<Vec<&'d Block>> {
    dependency_order(kind, dependencies(blocks))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_document;

    fn names(blocks: &[&Block]) -> Vec<String> {
        blocks.iter().map(|b| b.name.clone()).collect()
    }

    #[test]
    fn test_empty() {
        let ordered = order_blocks(BlockKind::Object, &[]).unwrap();
        assert!(ordered.is_empty());
    }

    #[test]
    fn test_reordering_by_dependency() {
        let doc = parse_document(
            "object jets\n take Jet\n reject dR(eta, muons.eta) < 0.4\n\
             object muons\n take Muon\n\
             object met\n take MissingET\n",
        )
        .unwrap();
        let blocks: Vec<&Block> = doc.blocks_of(BlockKind::Object).collect();
        let ordered = order_blocks(BlockKind::Object, &blocks).unwrap();
        assert_eq!(names(&ordered), vec!["muons", "met", "jets"]);
    }

    #[test]
    fn test_chain_resolves_in_one_pass() {
        let doc = parse_document(
            "cut c\n select b\ncut b\n select a\ncut a\n select x > 1\n",
        )
        .unwrap();
        let blocks: Vec<&Block> = doc.blocks_of(BlockKind::Cut).collect();
        let ordered = order_blocks(BlockKind::Cut, &blocks).unwrap();
        assert_eq!(names(&ordered), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_self_reference_ignored() {
        let doc = parse_document("object jets\n take Jet\n select jets.pt > 1\n").unwrap();
        let blocks: Vec<&Block> = doc.blocks_of(BlockKind::Object).collect();
        let deps = dependencies(&blocks);
        assert!(deps[0].depends_on.is_empty());
    }

    #[test]
    fn test_cycle_detected() {
        let doc = parse_document(
            "cut a\n select b\ncut b\n select a\ncut c\n select x > 0\n",
        )
        .unwrap();
        let blocks: Vec<&Block> = doc.blocks_of(BlockKind::Cut).collect();
        let err = order_blocks(BlockKind::Cut, &blocks).unwrap_err();
        match err {
            CompileError::CircularDependency { kind, blocks } => {
                assert_eq!(kind, BlockKind::Cut);
                assert_eq!(blocks, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
