//! Ladder-to-IR compiler.
//!
//! Translates a two-dimensional ladder diagram (typed blocks on an
//! integer grid, joined by directed wires) into a linear rung IR for a
//! downstream runtime.
//!
//! # Architecture
//!
//! ```text
//! Ladder ──► model validation ──► wire index (petgraph) ──► networks
//!                                        │
//!                                        ├── classify: start / terminal / tap
//!                                        ├── backward expression synthesis
//!                                        │   (memoized, common-prefix factored)
//!                                        └── terminal grouping ──► Rungs
//! ```
//!
//! Compilation is a pure function of its input: no I/O, no clocks, no
//! shared state. Diagnostics accumulate instead of aborting, so a partial
//! rung list alongside errors is a normal outcome.
//!
//! # Example
//!
//! ```
//! use ladder_lite_core::{compile, Ladder};
//!
//! let ladder: Ladder = serde_json::from_str(
//!     r#"{
//!         "name": "demo",
//!         "blocks": [
//!             {"id": "a", "x": 0, "y": 0, "kind": "contact", "symbol": "X0"},
//!             {"id": "b", "x": 1, "y": 0, "kind": "coil", "symbol": "Y0"}
//!         ],
//!         "wires": [{"from": "a", "to": "b"}]
//!     }"#,
//! )
//! .unwrap();
//!
//! let out = compile(&ladder);
//! assert_eq!(out.rungs.len(), 1);
//! assert!(!out.has_errors());
//! ```

pub mod compiler;
mod types;

pub use compiler::compile;
pub use compiler::model::{
    parse_preset_duration, Block, BlockKind, Ladder, PresetError, Wire, WireEnd,
};
pub use types::{
    extract_framed_blocks, Branch, CompiledLadder, DataType, Diagnostic, Element, Rung, Severity,
    Trigger, BLOCK_END_MARKER, BLOCK_START_MARKER,
};
