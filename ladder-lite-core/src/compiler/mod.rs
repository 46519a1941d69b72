//! The ladder compiler pipeline.
//!
//! `compile` is a pure, synchronous transformation: validate the model,
//! wire it (synthesizing wires for legacy inputs that carry none), split
//! the graph into networks, then synthesize and emit rungs per network.
//! Malformed input narrows the output instead of aborting it; everything
//! noteworthy lands in the diagnostic list.

pub mod classify;
pub mod emit;
pub mod expr;
pub mod graph;
pub mod model;
pub mod verifier;

use crate::types::CompiledLadder;
use graph::LadderGraph;
use model::{Ladder, Wire};
use std::collections::HashSet;
use tracing::debug;
use verifier::Diagnostics;

/// Compile a ladder into its rung IR. Never fails: diagnostics accumulate
/// and the rung list covers whatever valid structure remains.
pub fn compile(ladder: &Ladder) -> CompiledLadder {
    let mut diags = Diagnostics::default();

    if ladder.blocks.is_empty() {
        diags.error("ladder contains no blocks", vec![]);
        return CompiledLadder {
            rungs: Vec::new(),
            errors: diags.into_entries(),
        };
    }

    verifier::check_duplicate_ids(&ladder.blocks, &mut diags);
    verifier::check_presets(&ladder.blocks, &mut diags);

    // explicit wires are authoritative; auto-wiring is the compatibility
    // path for inputs with none at all
    let auto;
    let wires: &[Wire] = if ladder.wires.is_empty() {
        auto = graph::auto_wire(&ladder.blocks);
        &auto
    } else {
        &ladder.wires
    };

    let index = LadderGraph::build(&ladder.blocks, wires, &mut diags);
    verifier::check_disconnected(&ladder.blocks, &index, &mut diags);
    if index.connected_count() == 0 {
        diags.error("ladder has no connected blocks after wiring", vec![]);
        return CompiledLadder {
            rungs: Vec::new(),
            errors: diags.into_entries(),
        };
    }
    verifier::check_dangling_actions(&ladder.blocks, &index, &mut diags);

    let networks = graph::networks(&ladder.blocks, &index);
    debug!(networks = networks.len(), "partitioned ladder");

    let comment = if ladder.comment.is_empty() {
        &ladder.name
    } else {
        &ladder.comment
    };

    let mut rungs = Vec::new();
    let mut referenced: HashSet<usize> = HashSet::new();
    for net in &networks {
        emit::emit_network(
            &ladder.blocks,
            &index,
            net,
            comment,
            &mut rungs,
            &mut diags,
            &mut referenced,
        );
    }

    // wired contacts no emitted rung ever used: their chain reaches no action
    let mut stray_ids = Vec::new();
    let mut stray_symbols = Vec::new();
    for (ix, block) in ladder.blocks.iter().enumerate() {
        if block.kind.is_contact() && index.is_connected(ix) && !referenced.contains(&ix) {
            stray_ids.push(block.id.clone());
            stray_symbols.push(block.kind.symbol().unwrap_or(&block.id).to_string());
        }
    }
    if !stray_ids.is_empty() {
        diags.warning(
            format!(
                "contact path never reaches an action: {}",
                stray_symbols.join(", ")
            ),
            stray_ids,
        );
    }

    debug!(rungs = rungs.len(), "compiled ladder");
    CompiledLadder {
        rungs,
        errors: diags.into_entries(),
    }
}
