//! Per-network role tagging.
//!
//! A node's role decides two things: whether it is driven as a terminal of
//! its own rung, and what it contributes when it sits inside another
//! terminal's condition.

use super::graph::LadderGraph;
use super::model::Block;

/// What a node contributes to an expression when walked as a predecessor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Contribution {
    /// Leaf element only: contacts, compare blocks, mid-chain timers and
    /// counters.
    Leaf,
    /// Leaf element followed by a tap marker: an action whose output also
    /// feeds non-action logic.
    LeafTap,
    /// Nothing: a pass-through action whose downstream is exclusively
    /// other actions. It propagates power but lands in its own rung.
    PassThrough,
}

/// True for a left-rail entry: a contact at x = 0 with no predecessor.
pub fn is_start(blocks: &[Block], index: &LadderGraph, ix: usize) -> bool {
    blocks[ix].kind.is_contact() && blocks[ix].x == 0 && index.preds_of(ix).is_empty()
}

/// True for nodes the rung drives:
/// - an action with no downstream at all,
/// - an action whose downstream is exclusively other actions,
/// - a timer or counter with no outgoing wire.
///
/// Compare function blocks are never terminals.
pub fn is_terminal(blocks: &[Block], index: &LadderGraph, ix: usize) -> bool {
    let kind = &blocks[ix].kind;
    if kind.is_action() {
        index
            .succs_of(ix)
            .iter()
            .all(|&s| blocks[s].kind.is_action())
    } else if kind.is_timer() || kind.is_counter() {
        index.succs_of(ix).is_empty()
    } else {
        false
    }
}

/// Contribution of `ix` when it appears inside another node's condition.
pub fn contribution(blocks: &[Block], index: &LadderGraph, ix: usize) -> Contribution {
    let kind = &blocks[ix].kind;
    if !kind.is_action() {
        return Contribution::Leaf;
    }
    let succs = index.succs_of(ix);
    if succs.iter().any(|&s| !blocks[s].kind.is_action()) {
        Contribution::LeafTap
    } else {
        Contribution::PassThrough
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::graph::LadderGraph;
    use crate::compiler::model::{Block, BlockKind, Wire};
    use crate::compiler::verifier::Diagnostics;
    use crate::types::DataType;

    fn build(blocks: &[Block], wires: &[Wire]) -> LadderGraph {
        let mut diags = Diagnostics::default();
        LadderGraph::build(blocks, wires, &mut diags)
    }

    fn contact(id: &str, x: u32, y: u32) -> Block {
        Block {
            id: id.to_string(),
            x,
            y,
            kind: BlockKind::Contact {
                symbol: format!("X{id}"),
                inverted: false,
                trigger: Default::default(),
            },
        }
    }

    fn coil(id: &str, x: u32, y: u32) -> Block {
        Block {
            id: id.to_string(),
            x,
            y,
            kind: BlockKind::Coil {
                symbol: format!("Y{id}"),
                inverted: false,
            },
        }
    }

    #[test]
    fn start_requires_left_rail_and_no_predecessor() {
        let blocks = vec![contact("a", 0, 0), contact("b", 0, 1), coil("c", 1, 0)];
        // b is at x=0 but fed by nothing; a drives c
        let index = build(&blocks, &[Wire::between("a", "c")]);
        assert!(is_start(&blocks, &index, 0));
        assert!(is_start(&blocks, &index, 1));
        assert!(!is_start(&blocks, &index, 2));
    }

    #[test]
    fn action_chain_members_are_terminals() {
        // a → b(coil) → c(coil): both coils terminal, b also pass-through
        let blocks = vec![contact("a", 0, 0), coil("b", 1, 0), coil("c", 2, 0)];
        let index = build(
            &blocks,
            &[Wire::between("a", "b"), Wire::between("b", "c")],
        );
        assert!(is_terminal(&blocks, &index, 1));
        assert!(is_terminal(&blocks, &index, 2));
        assert_eq!(contribution(&blocks, &index, 1), Contribution::PassThrough);
    }

    #[test]
    fn action_feeding_logic_requires_a_tap() {
        // a → b(coil) → c(contact) → d(coil)
        let blocks = vec![
            contact("a", 0, 0),
            coil("b", 1, 0),
            contact("c", 2, 0),
            coil("d", 3, 0),
        ];
        let index = build(
            &blocks,
            &[
                Wire::between("a", "b"),
                Wire::between("b", "c"),
                Wire::between("c", "d"),
            ],
        );
        assert!(!is_terminal(&blocks, &index, 1));
        assert_eq!(contribution(&blocks, &index, 1), Contribution::LeafTap);
        assert_eq!(contribution(&blocks, &index, 2), Contribution::Leaf);
    }

    #[test]
    fn compare_blocks_are_never_terminals() {
        let blocks = vec![
            contact("a", 0, 0),
            Block {
                id: "cmp".to_string(),
                x: 1,
                y: 0,
                kind: BlockKind::FbEq {
                    data_type: DataType::I16,
                    in1: "D0".to_string(),
                    in2: "D1".to_string(),
                },
            },
        ];
        let index = build(&blocks, &[Wire::between("a", "cmp")]);
        assert!(!is_terminal(&blocks, &index, 1));
        assert_eq!(contribution(&blocks, &index, 1), Contribution::Leaf);
    }

    #[test]
    fn unwired_timer_is_a_terminal() {
        let blocks = vec![
            contact("a", 0, 0),
            Block {
                id: "t".to_string(),
                x: 1,
                y: 0,
                kind: BlockKind::TimerTon {
                    symbol: "T0".to_string(),
                    preset: "T#500ms".to_string(),
                },
            },
            coil("c", 2, 1),
        ];
        let index = build(&blocks, &[Wire::between("a", "t")]);
        assert!(is_terminal(&blocks, &index, 1));

        // once the timer feeds further logic it is an intermediate
        let index = build(
            &blocks,
            &[Wire::between("a", "t"), Wire::between("t", "c")],
        );
        assert!(!is_terminal(&blocks, &index, 1));
    }
}
