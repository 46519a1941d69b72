//! Terminal grouping and rung emission.
//!
//! Terminals sharing a driving condition collapse into one rung. The group
//! key pairs the terminal's kind with a canonical fingerprint of the
//! condition: a dedicated byte writer serializes each element with
//! node-identity fields (id, address) stripped, the buffer is hashed with
//! SHA-256, and buffers are compared on digest collision rather than
//! trusting the hash alone.

use super::classify::is_terminal;
use super::expr::ExprBuilder;
use super::graph::{LadderGraph, Network};
use super::model::Block;
use super::verifier::Diagnostics;
use crate::types::{DataType, Element, Rung, Trigger};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use tracing::debug;

struct RungGroup {
    canon: Vec<u8>,
    condition: Vec<Element>,
    terminals: Vec<usize>,
}

/// Emit the rungs of one network, appending to `rungs`. Every node that
/// contributed to an emitted rung is added to `referenced`.
pub fn emit_network(
    blocks: &[Block],
    index: &LadderGraph,
    net: &Network,
    comment: &str,
    rungs: &mut Vec<Rung>,
    diags: &mut Diagnostics,
    referenced: &mut HashSet<usize>,
) {
    let mut terminals: Vec<usize> = net
        .nodes
        .iter()
        .copied()
        .filter(|&ix| is_terminal(blocks, index, ix))
        .collect();
    terminals.sort_by_key(|&ix| (blocks[ix].y, blocks[ix].x, ix));

    let mut builder = ExprBuilder::new(blocks, index);
    // insertion order of groups is emission order
    let mut groups: Vec<RungGroup> = Vec::new();
    let mut lookup: HashMap<([u8; 32], &'static str), Vec<usize>> = HashMap::new();

    for &terminal in &terminals {
        let condition = builder.condition_for(terminal);
        let canon = fingerprint(&condition);
        let digest: [u8; 32] = Sha256::digest(&canon).into();
        let key = (digest, blocks[terminal].kind.kind_name());

        let candidates = lookup.entry(key).or_default();
        let existing = candidates
            .iter()
            .copied()
            .find(|&g| groups[g].canon == canon);
        match existing {
            Some(g) => groups[g].terminals.push(terminal),
            None => {
                candidates.push(groups.len());
                groups.push(RungGroup {
                    canon,
                    condition,
                    terminals: vec![terminal],
                });
            }
        }
    }

    debug!(
        terminals = terminals.len(),
        rungs = groups.len(),
        "emitting network"
    );

    for group in groups {
        let mut elements = group.condition;
        for terminal in &group.terminals {
            elements.push(blocks[*terminal].kind.to_element());
        }
        rungs.push(Rung {
            comment: comment.to_string(),
            elements,
        });
    }

    referenced.extend(builder.visited_nodes().iter().copied());
    referenced.extend(terminals);

    let cycles = builder.cycle_node_ids();
    if !cycles.is_empty() {
        diags.warning(
            "cycle detected in ladder logic; branch truncated".to_string(),
            cycles,
        );
    }
}

/// Canonical fingerprint of a condition list. Node-identity fields are
/// skipped so the key reflects shape and settings, not which blocks
/// supplied them.
pub(crate) fn fingerprint(elements: &[Element]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(elements.len() * 8);
    write_list(elements, &mut buf);
    buf
}

fn write_list(elements: &[Element], buf: &mut Vec<u8>) {
    write_u32(elements.len() as u32, buf);
    for element in elements {
        write_element(element, buf);
    }
}

fn write_element(element: &Element, buf: &mut Vec<u8>) {
    match element {
        Element::Contact {
            inverted, trigger, ..
        } => {
            buf.push(0x01);
            buf.push(*inverted as u8);
            buf.push(trigger_code(*trigger));
        }
        Element::Coil { inverted, .. } => {
            buf.push(0x02);
            buf.push(*inverted as u8);
        }
        Element::CoilSet { inverted, .. } => {
            buf.push(0x03);
            buf.push(*inverted as u8);
        }
        Element::CoilRset { inverted, .. } => {
            buf.push(0x04);
            buf.push(*inverted as u8);
        }
        Element::TimerTon { preset, .. } => {
            buf.push(0x05);
            write_str(preset, buf);
        }
        Element::TimerTof { preset, .. } => {
            buf.push(0x06);
            write_str(preset, buf);
        }
        Element::TimerTp { preset, .. } => {
            buf.push(0x07);
            write_str(preset, buf);
        }
        Element::CounterUp { preset, .. } => {
            buf.push(0x08);
            buf.extend_from_slice(&preset.to_le_bytes());
        }
        Element::CounterDown { preset, .. } => {
            buf.push(0x09);
            buf.extend_from_slice(&preset.to_le_bytes());
        }
        Element::MathAdd {
            data_type,
            in1,
            in2,
            out,
            ..
        } => write_math_binary(0x10, *data_type, in1, in2, out, buf),
        Element::MathSub {
            data_type,
            in1,
            in2,
            out,
            ..
        } => write_math_binary(0x11, *data_type, in1, in2, out, buf),
        Element::MathMul {
            data_type,
            in1,
            in2,
            out,
            ..
        } => write_math_binary(0x12, *data_type, in1, in2, out, buf),
        Element::MathDiv {
            data_type,
            in1,
            in2,
            out,
            ..
        } => write_math_binary(0x13, *data_type, in1, in2, out, buf),
        Element::MathMod {
            data_type,
            in1,
            in2,
            out,
            ..
        } => write_math_binary(0x14, *data_type, in1, in2, out, buf),
        Element::MathNeg {
            data_type, in1, out, ..
        } => write_math_unary(0x15, *data_type, in1, out, buf),
        Element::MathAbs {
            data_type, in1, out, ..
        } => write_math_unary(0x16, *data_type, in1, out, buf),
        Element::Inc { data_type, .. } => {
            buf.push(0x17);
            buf.push(data_type_code(*data_type));
        }
        Element::Dec { data_type, .. } => {
            buf.push(0x18);
            buf.push(data_type_code(*data_type));
        }
        Element::CompareEq {
            data_type,
            in1,
            in2,
        } => write_compare(0x20, *data_type, in1, in2, buf),
        Element::CompareNeq {
            data_type,
            in1,
            in2,
        } => write_compare(0x21, *data_type, in1, in2, buf),
        Element::CompareGt {
            data_type,
            in1,
            in2,
        } => write_compare(0x22, *data_type, in1, in2, buf),
        Element::CompareLt {
            data_type,
            in1,
            in2,
        } => write_compare(0x23, *data_type, in1, in2, buf),
        Element::CompareGte {
            data_type,
            in1,
            in2,
        } => write_compare(0x24, *data_type, in1, in2, buf),
        Element::CompareLte {
            data_type,
            in1,
            in2,
        } => write_compare(0x25, *data_type, in1, in2, buf),
        Element::Move {
            data_type,
            in1,
            out,
        } => {
            buf.push(0x26);
            buf.push(data_type_code(*data_type));
            write_str(in1, buf);
            write_str(out, buf);
        }
        Element::Or { branches } => {
            buf.push(0x30);
            write_u32(branches.len() as u32, buf);
            for branch in branches {
                write_list(&branch.elements, buf);
            }
        }
        Element::Tap => buf.push(0x31),
    }
}

fn write_math_binary(
    tag: u8,
    data_type: DataType,
    in1: &Option<String>,
    in2: &Option<String>,
    out: &Option<String>,
    buf: &mut Vec<u8>,
) {
    buf.push(tag);
    buf.push(data_type_code(data_type));
    write_opt_str(in1, buf);
    write_opt_str(in2, buf);
    write_opt_str(out, buf);
}

fn write_math_unary(
    tag: u8,
    data_type: DataType,
    in1: &Option<String>,
    out: &Option<String>,
    buf: &mut Vec<u8>,
) {
    buf.push(tag);
    buf.push(data_type_code(data_type));
    write_opt_str(in1, buf);
    write_opt_str(out, buf);
}

fn write_compare(tag: u8, data_type: DataType, in1: &str, in2: &str, buf: &mut Vec<u8>) {
    buf.push(tag);
    buf.push(data_type_code(data_type));
    write_str(in1, buf);
    write_str(in2, buf);
}

fn write_u32(value: u32, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn write_str(value: &str, buf: &mut Vec<u8>) {
    write_u32(value.len() as u32, buf);
    buf.extend_from_slice(value.as_bytes());
}

fn write_opt_str(value: &Option<String>, buf: &mut Vec<u8>) {
    match value {
        Some(v) => {
            buf.push(1);
            write_str(v, buf);
        }
        None => buf.push(0),
    }
}

fn trigger_code(trigger: Trigger) -> u8 {
    match trigger {
        Trigger::Normal => 0,
        Trigger::Rising => 1,
        Trigger::Falling => 2,
        Trigger::Change => 3,
    }
}

fn data_type_code(data_type: DataType) -> u8 {
    match data_type {
        DataType::I8 => 0,
        DataType::U8 => 1,
        DataType::I16 => 2,
        DataType::U16 => 3,
        DataType::I32 => 4,
        DataType::U32 => 5,
        DataType::I64 => 6,
        DataType::U64 => 7,
        DataType::F32 => 8,
        DataType::F64 => 9,
    }
}
