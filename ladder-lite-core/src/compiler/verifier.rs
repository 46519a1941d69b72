//! Structural diagnostics over the input ladder.
//!
//! Every check accumulates into the [`Diagnostics`] collector; nothing here
//! aborts compilation. The emitter produces whatever rungs the remaining
//! valid structure supports.

use super::graph::LadderGraph;
use super::model::{parse_preset_duration, Block, BlockKind};
use crate::types::{Diagnostic, Severity};
use std::collections::HashSet;

/// Accumulator for compile diagnostics.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn error(&mut self, message: impl Into<String>, node_ids: Vec<String>) {
        self.entries.push(Diagnostic {
            severity: Severity::Error,
            message: message.into(),
            node_ids,
        });
    }

    pub fn warning(&mut self, message: impl Into<String>, node_ids: Vec<String>) {
        self.entries.push(Diagnostic {
            severity: Severity::Warning,
            message: message.into(),
            node_ids,
        });
    }

    pub fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
    }
}

/// Report blocks whose id re-uses an earlier block's id. The first
/// occurrence stays authoritative for wire resolution.
pub fn check_duplicate_ids(blocks: &[Block], diags: &mut Diagnostics) {
    let mut seen = HashSet::new();
    for block in blocks {
        if !seen.insert(block.id.as_str()) {
            diags.error(
                format!("duplicate block id '{}'", block.id),
                vec![block.id.clone()],
            );
        }
    }
}

/// Validate timer preset strings against the `T#` duration grammar.
pub fn check_presets(blocks: &[Block], diags: &mut Diagnostics) {
    for block in blocks {
        let preset = match &block.kind {
            BlockKind::TimerTon { preset, .. }
            | BlockKind::TimerTof { preset, .. }
            | BlockKind::TimerTp { preset, .. } => preset,
            _ => continue,
        };
        if let Err(err) = parse_preset_duration(preset) {
            let symbol = block.kind.symbol().unwrap_or(&block.id);
            diags.error(
                format!("timer {symbol}: invalid preset '{preset}': {err}"),
                vec![block.id.clone()],
            );
        }
    }
}

/// Report blocks that no kept wire touches, grouped by kind family so a
/// ladder full of stray contacts produces one entry, not dozens.
pub fn check_disconnected(blocks: &[Block], index: &LadderGraph, diags: &mut Diagnostics) {
    const FAMILIES: [&str; 5] = ["contact", "coil", "timer", "counter", "function block"];
    for family in FAMILIES {
        let mut ids = Vec::new();
        let mut symbols = Vec::new();
        for (ix, block) in blocks.iter().enumerate() {
            if block.kind.family() == family && !index.is_connected(ix) {
                ids.push(block.id.clone());
                symbols.push(block.kind.symbol().unwrap_or(&block.id).to_string());
            }
        }
        if !ids.is_empty() {
            diags.error(
                format!("disconnected {family} block(s): {}", symbols.join(", ")),
                ids,
            );
        }
    }
}

/// Report wired coils, timers and counters with no incoming connection.
/// Without an incoming wire nothing ever drives them.
pub fn check_dangling_actions(blocks: &[Block], index: &LadderGraph, diags: &mut Diagnostics) {
    for (ix, block) in blocks.iter().enumerate() {
        let kind = &block.kind;
        if !(kind.is_action() || kind.is_timer() || kind.is_counter()) {
            continue;
        }
        if index.is_connected(ix) && index.preds_of(ix).is_empty() {
            let symbol = kind.symbol().unwrap_or(&block.id);
            diags.error(
                format!("dangling {} '{symbol}' has no incoming connection", kind.family()),
                vec![block.id.clone()],
            );
        }
    }
}
