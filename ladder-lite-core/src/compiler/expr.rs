//! Backward expression synthesis.
//!
//! For each terminal the builder walks the wired graph backwards, turning
//! series runs into flat element sequences and merge points into OR groups,
//! factoring out the longest shared branch prefix so parallel paths never
//! re-evaluate their common head. Completed lists are memoized per node and
//! shared by every terminal in the network; the memo never crosses a
//! network boundary.

use super::classify::{contribution, Contribution};
use super::graph::{LadderGraph, NeighborList};
use super::model::Block;
use crate::types::{Branch, Element};
use std::collections::{BTreeSet, HashMap, HashSet};

pub struct ExprBuilder<'a> {
    blocks: &'a [Block],
    index: &'a LadderGraph,
    memo: HashMap<usize, Vec<Element>>,
    visited: HashSet<usize>,
    cycle_ids: BTreeSet<String>,
}

impl<'a> ExprBuilder<'a> {
    pub fn new(blocks: &'a [Block], index: &'a LadderGraph) -> Self {
        ExprBuilder {
            blocks,
            index,
            memo: HashMap::new(),
            visited: HashSet::new(),
            cycle_ids: BTreeSet::new(),
        }
    }

    /// The condition list driving `terminal`, not including the terminal
    /// itself. Empty means unconditional.
    pub fn condition_for(&mut self, terminal: usize) -> Vec<Element> {
        self.visited.insert(terminal);
        let preds = self.filtered_preds(terminal);
        let mut path = vec![terminal];
        match preds.len() {
            0 => Vec::new(),
            1 => self.build(preds[0], &mut path).unwrap_or_default(),
            _ => {
                let branches = self.branches(&preds, &mut path);
                assemble(branches)
            }
        }
    }

    /// Every node the builder walked while assembling conditions. Used by
    /// the emitter to find contact paths no rung ever referenced.
    pub fn visited_nodes(&self) -> &HashSet<usize> {
        &self.visited
    }

    /// Ids of blocks where a back edge truncated a branch, sorted.
    pub fn cycle_node_ids(&self) -> Vec<String> {
        self.cycle_ids.iter().cloned().collect()
    }

    /// The element list leading into and including `ix`. `None` marks a
    /// null branch: `ix` is already on the current path, so recursing
    /// would never terminate.
    fn build(&mut self, ix: usize, path: &mut Vec<usize>) -> Option<Vec<Element>> {
        if path.contains(&ix) {
            self.cycle_ids.insert(self.blocks[ix].id.clone());
            return None;
        }
        if let Some(cached) = self.memo.get(&ix) {
            return Some(cached.clone());
        }
        self.visited.insert(ix);
        path.push(ix);

        let preds = self.filtered_preds(ix);
        let mut result = match preds.len() {
            0 => Vec::new(),
            1 => self.build(preds[0], path).unwrap_or_default(),
            _ => {
                let branches = self.branches(&preds, path);
                assemble(branches)
            }
        };
        match contribution(self.blocks, self.index, ix) {
            Contribution::Leaf => result.push(self.blocks[ix].kind.to_element()),
            Contribution::LeafTap => {
                result.push(self.blocks[ix].kind.to_element());
                result.push(Element::Tap);
            }
            Contribution::PassThrough => {}
        }

        path.pop();
        self.memo.insert(ix, result.clone());
        Some(result)
    }

    /// Build each predecessor's list, discarding null and empty branches.
    fn branches(&mut self, preds: &[usize], path: &mut Vec<usize>) -> Vec<Vec<Element>> {
        preds
            .iter()
            .filter_map(|&p| self.build(p, path))
            .filter(|b| !b.is_empty())
            .collect()
    }

    /// Predecessors that still propagate logic, sorted by grid position
    /// `(y, x)`. Terminal actions with nothing downstream are excluded;
    /// they never carry power forward.
    fn filtered_preds(&self, ix: usize) -> NeighborList {
        let mut preds: NeighborList = self
            .index
            .preds_of(ix)
            .into_iter()
            .filter(|&p| {
                !(self.blocks[p].kind.is_action() && self.index.succs_of(p).is_empty())
            })
            .collect();
        preds.sort_by_key(|&p| (self.blocks[p].y, self.blocks[p].x, p));
        preds
    }
}

/// Collapse a branch set into a single element sequence: factor the common
/// prefix, then wrap whatever still differs in an OR group.
fn assemble(branches: Vec<Vec<Element>>) -> Vec<Element> {
    match branches.len() {
        0 => Vec::new(),
        1 => branches.into_iter().next().unwrap(),
        _ => {
            let (mut out, factored) = factor_common_prefix(branches);
            let mut remaining = factored;
            match remaining.len() {
                0 => {}
                1 => out.append(&mut remaining[0]),
                _ => out.push(Element::Or {
                    branches: remaining
                        .into_iter()
                        .map(|elements| Branch { elements })
                        .collect(),
                }),
            }
            out
        }
    }
}

/// Split off the longest leading element run shared by every branch.
/// Branches left empty after the split are dropped.
fn factor_common_prefix(branches: Vec<Vec<Element>>) -> (Vec<Element>, Vec<Vec<Element>>) {
    let min_len = branches.iter().map(Vec::len).min().unwrap_or(0);
    let mut k = 0;
    'scan: while k < min_len {
        let probe = &branches[0][k];
        for branch in &branches[1..] {
            if branch[k] != *probe {
                break 'scan;
            }
        }
        k += 1;
    }

    let prefix = branches[0][..k].to_vec();
    let factored = branches
        .into_iter()
        .map(|b| b[k..].to_vec())
        .filter(|b| !b.is_empty())
        .collect();
    (prefix, factored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::model::{Block, BlockKind, Wire};
    use crate::compiler::verifier::Diagnostics;
    use crate::types::Trigger;

    fn contact(id: &str, x: u32, y: u32, symbol: &str) -> Block {
        Block {
            id: id.to_string(),
            x,
            y,
            kind: BlockKind::Contact {
                symbol: symbol.to_string(),
                inverted: false,
                trigger: Default::default(),
            },
        }
    }

    fn coil(id: &str, x: u32, y: u32, symbol: &str) -> Block {
        Block {
            id: id.to_string(),
            x,
            y,
            kind: BlockKind::Coil {
                symbol: symbol.to_string(),
                inverted: false,
            },
        }
    }

    fn contact_el(symbol: &str) -> Element {
        Element::Contact {
            address: symbol.to_string(),
            inverted: false,
            trigger: Trigger::Normal,
        }
    }

    fn build_index(blocks: &[Block], wires: &[Wire]) -> LadderGraph {
        let mut diags = Diagnostics::default();
        LadderGraph::build(blocks, wires, &mut diags)
    }

    #[test]
    fn series_chain_flattens_in_order() {
        let blocks = vec![
            contact("a", 0, 0, "X0"),
            contact("b", 1, 0, "X1"),
            coil("c", 2, 0, "Y0"),
        ];
        let index = build_index(
            &blocks,
            &[Wire::between("a", "b"), Wire::between("b", "c")],
        );
        let mut builder = ExprBuilder::new(&blocks, &index);
        assert_eq!(
            builder.condition_for(2),
            vec![contact_el("X0"), contact_el("X1")]
        );
    }

    #[test]
    fn parallel_branches_sort_by_grid_position() {
        // the y=0 branch must come first even though its block was listed second
        let blocks = vec![
            contact("low", 0, 1, "X1"),
            contact("high", 0, 0, "X0"),
            coil("sink", 1, 0, "Y0"),
        ];
        let index = build_index(
            &blocks,
            &[Wire::between("low", "sink"), Wire::between("high", "sink")],
        );
        let mut builder = ExprBuilder::new(&blocks, &index);
        assert_eq!(
            builder.condition_for(2),
            vec![Element::Or {
                branches: vec![
                    Branch {
                        elements: vec![contact_el("X0")]
                    },
                    Branch {
                        elements: vec![contact_el("X1")]
                    },
                ]
            }]
        );
    }

    #[test]
    fn common_prefix_is_factored_out() {
        // a → b → d, a → c → d: both branches into d start with a
        let blocks = vec![
            contact("a", 0, 0, "X0"),
            contact("b", 1, 0, "X1"),
            contact("c", 1, 1, "X2"),
            coil("d", 2, 0, "Y0"),
        ];
        let index = build_index(
            &blocks,
            &[
                Wire::between("a", "b"),
                Wire::between("b", "d"),
                Wire::between("a", "c"),
                Wire::between("c", "d"),
            ],
        );
        let mut builder = ExprBuilder::new(&blocks, &index);
        assert_eq!(
            builder.condition_for(3),
            vec![
                contact_el("X0"),
                Element::Or {
                    branches: vec![
                        Branch {
                            elements: vec![contact_el("X1")]
                        },
                        Branch {
                            elements: vec![contact_el("X2")]
                        },
                    ]
                },
            ]
        );
    }

    #[test]
    fn branch_equal_to_prefix_collapses_without_or_group() {
        // a → d and a → b → d: the short branch is exactly the prefix
        let blocks = vec![
            contact("a", 0, 0, "X0"),
            contact("b", 1, 1, "X1"),
            coil("d", 2, 0, "Y0"),
        ];
        let index = build_index(
            &blocks,
            &[
                Wire::between("a", "d"),
                Wire::between("a", "b"),
                Wire::between("b", "d"),
            ],
        );
        let mut builder = ExprBuilder::new(&blocks, &index);
        assert_eq!(
            builder.condition_for(2),
            vec![contact_el("X0"), contact_el("X1")]
        );
    }

    #[test]
    fn differing_heads_do_not_factor() {
        let branches = vec![
            vec![contact_el("X0"), contact_el("X1")],
            vec![contact_el("X5"), contact_el("X1")],
        ];
        let (prefix, factored) = factor_common_prefix(branches);
        assert!(prefix.is_empty());
        assert_eq!(factored.len(), 2);
    }

    #[test]
    fn back_edge_truncates_branch_and_is_recorded() {
        // b ⇄ c cycle spliced into an otherwise valid chain
        let blocks = vec![
            contact("a", 0, 0, "X0"),
            contact("b", 1, 0, "X1"),
            contact("c", 2, 0, "X2"),
            coil("d", 3, 0, "Y0"),
        ];
        let mut diags = Diagnostics::default();
        let mut index = LadderGraph::build(
            &blocks,
            &[
                Wire::between("a", "b"),
                Wire::between("b", "c"),
                Wire::between("c", "d"),
            ],
            &mut diags,
        );
        index.insert_edge(2, 1); // c → b, bypassing wire validation

        let mut builder = ExprBuilder::new(&blocks, &index);
        let condition = builder.condition_for(3);
        // the c → b back edge contributes nothing; the series chain survives
        assert_eq!(
            condition,
            vec![contact_el("X0"), contact_el("X1"), contact_el("X2")]
        );
        // the guard fires when the walk from b re-enters c mid-path
        assert_eq!(builder.cycle_node_ids(), vec!["c".to_string()]);
    }

    #[test]
    fn pass_through_action_contributes_no_element() {
        // a → b(coil) → c(coil): c's condition is just the contact
        let blocks = vec![
            contact("a", 0, 0, "X0"),
            coil("b", 1, 0, "Y0"),
            coil("c", 2, 0, "Y1"),
        ];
        let index = build_index(
            &blocks,
            &[Wire::between("a", "b"), Wire::between("b", "c")],
        );
        let mut builder = ExprBuilder::new(&blocks, &index);
        assert_eq!(builder.condition_for(2), vec![contact_el("X0")]);
    }

    #[test]
    fn tapped_action_emits_element_and_marker() {
        // a → b(coil) → c(contact) → d(coil)
        let blocks = vec![
            contact("a", 0, 0, "X0"),
            coil("b", 1, 0, "Y0"),
            contact("c", 2, 0, "X1"),
            coil("d", 3, 0, "Y1"),
        ];
        let index = build_index(
            &blocks,
            &[
                Wire::between("a", "b"),
                Wire::between("b", "c"),
                Wire::between("c", "d"),
            ],
        );
        let mut builder = ExprBuilder::new(&blocks, &index);
        assert_eq!(
            builder.condition_for(3),
            vec![
                contact_el("X0"),
                Element::Coil {
                    address: "Y0".to_string(),
                    inverted: false,
                },
                Element::Tap,
                contact_el("X1"),
            ]
        );
    }
}
