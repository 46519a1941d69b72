//! Input data model: blocks, wires, and the ladder record itself.
//!
//! Kinds are a closed set modeled as a tagged enum; every stringly-typed
//! check collapses to a pattern match. Legacy counter spellings
//! (`counter_u`/`counter_ctu`, `counter_d`/`counter_ctd`) are accepted at
//! the serde boundary and normalized to `counter_up`/`counter_down`; no
//! second spelling propagates inward.

use crate::types::{DataType, Element, Trigger};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─── Blocks ───────────────────────────────────────────────────

/// A typed block on the ladder grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Stable id, unique within a ladder.
    pub id: String,
    pub x: u32,
    pub y: u32,
    #[serde(flatten)]
    pub kind: BlockKind,
}

/// The closed set of block kinds with their per-kind attributes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockKind {
    Contact {
        symbol: String,
        #[serde(default)]
        inverted: bool,
        #[serde(default)]
        trigger: Trigger,
    },
    Coil {
        symbol: String,
        #[serde(default)]
        inverted: bool,
    },
    CoilSet {
        symbol: String,
        #[serde(default)]
        inverted: bool,
    },
    CoilRset {
        symbol: String,
        #[serde(default)]
        inverted: bool,
    },
    TimerTon {
        symbol: String,
        preset: String,
    },
    TimerTof {
        symbol: String,
        preset: String,
    },
    TimerTp {
        symbol: String,
        preset: String,
    },
    #[serde(alias = "counter_u", alias = "counter_ctu")]
    CounterUp {
        symbol: String,
        preset: i64,
    },
    #[serde(alias = "counter_d", alias = "counter_ctd")]
    CounterDown {
        symbol: String,
        preset: i64,
    },
    FbAdd {
        data_type: DataType,
        #[serde(default)]
        symbol: Option<String>,
        #[serde(default)]
        in1: Option<String>,
        #[serde(default)]
        in2: Option<String>,
        #[serde(default)]
        out: Option<String>,
    },
    FbSub {
        data_type: DataType,
        #[serde(default)]
        symbol: Option<String>,
        #[serde(default)]
        in1: Option<String>,
        #[serde(default)]
        in2: Option<String>,
        #[serde(default)]
        out: Option<String>,
    },
    FbMul {
        data_type: DataType,
        #[serde(default)]
        symbol: Option<String>,
        #[serde(default)]
        in1: Option<String>,
        #[serde(default)]
        in2: Option<String>,
        #[serde(default)]
        out: Option<String>,
    },
    FbDiv {
        data_type: DataType,
        #[serde(default)]
        symbol: Option<String>,
        #[serde(default)]
        in1: Option<String>,
        #[serde(default)]
        in2: Option<String>,
        #[serde(default)]
        out: Option<String>,
    },
    FbMod {
        data_type: DataType,
        #[serde(default)]
        symbol: Option<String>,
        #[serde(default)]
        in1: Option<String>,
        #[serde(default)]
        in2: Option<String>,
        #[serde(default)]
        out: Option<String>,
    },
    FbNeg {
        data_type: DataType,
        #[serde(default)]
        symbol: Option<String>,
        #[serde(default)]
        in1: Option<String>,
        #[serde(default)]
        out: Option<String>,
    },
    FbAbs {
        data_type: DataType,
        #[serde(default)]
        symbol: Option<String>,
        #[serde(default)]
        in1: Option<String>,
        #[serde(default)]
        out: Option<String>,
    },
    FbInc {
        data_type: DataType,
        symbol: String,
    },
    FbDec {
        data_type: DataType,
        symbol: String,
    },
    FbEq {
        data_type: DataType,
        in1: String,
        in2: String,
    },
    FbNeq {
        data_type: DataType,
        in1: String,
        in2: String,
    },
    FbGt {
        data_type: DataType,
        in1: String,
        in2: String,
    },
    FbLt {
        data_type: DataType,
        in1: String,
        in2: String,
    },
    FbGte {
        data_type: DataType,
        in1: String,
        in2: String,
    },
    FbLte {
        data_type: DataType,
        in1: String,
        in2: String,
    },
    FbMove {
        data_type: DataType,
        in1: String,
        out: String,
    },
}

impl BlockKind {
    pub fn is_contact(&self) -> bool {
        matches!(self, BlockKind::Contact { .. })
    }

    pub fn is_coil(&self) -> bool {
        matches!(
            self,
            BlockKind::Coil { .. } | BlockKind::CoilSet { .. } | BlockKind::CoilRset { .. }
        )
    }

    pub fn is_timer(&self) -> bool {
        matches!(
            self,
            BlockKind::TimerTon { .. } | BlockKind::TimerTof { .. } | BlockKind::TimerTp { .. }
        )
    }

    pub fn is_counter(&self) -> bool {
        matches!(
            self,
            BlockKind::CounterUp { .. } | BlockKind::CounterDown { .. }
        )
    }

    pub fn is_math_binary(&self) -> bool {
        matches!(
            self,
            BlockKind::FbAdd { .. }
                | BlockKind::FbSub { .. }
                | BlockKind::FbMul { .. }
                | BlockKind::FbDiv { .. }
                | BlockKind::FbMod { .. }
        )
    }

    pub fn is_math_unary(&self) -> bool {
        matches!(self, BlockKind::FbNeg { .. } | BlockKind::FbAbs { .. })
    }

    pub fn is_inc_dec(&self) -> bool {
        matches!(self, BlockKind::FbInc { .. } | BlockKind::FbDec { .. })
    }

    pub fn is_compare_fb(&self) -> bool {
        matches!(
            self,
            BlockKind::FbEq { .. }
                | BlockKind::FbNeq { .. }
                | BlockKind::FbGt { .. }
                | BlockKind::FbLt { .. }
                | BlockKind::FbGte { .. }
                | BlockKind::FbLte { .. }
        )
    }

    pub fn is_move(&self) -> bool {
        matches!(self, BlockKind::FbMove { .. })
    }

    pub fn is_function_block(&self) -> bool {
        self.is_math_binary()
            || self.is_math_unary()
            || self.is_inc_dec()
            || self.is_compare_fb()
            || self.is_move()
    }

    /// An action is a write sink: a coil or a non-compare function block.
    /// Compare blocks contribute boolean output into logic instead.
    pub fn is_action(&self) -> bool {
        self.is_coil() || (self.is_function_block() && !self.is_compare_fb())
    }

    /// Kind family used to group disconnected-block diagnostics.
    pub fn family(&self) -> &'static str {
        if self.is_contact() {
            "contact"
        } else if self.is_coil() {
            "coil"
        } else if self.is_timer() {
            "timer"
        } else if self.is_counter() {
            "counter"
        } else {
            "function block"
        }
    }

    /// Canonical kind spelling; used as the terminal-kind half of a rung
    /// group key.
    pub fn kind_name(&self) -> &'static str {
        match self {
            BlockKind::Contact { .. } => "contact",
            BlockKind::Coil { .. } => "coil",
            BlockKind::CoilSet { .. } => "coil_set",
            BlockKind::CoilRset { .. } => "coil_rset",
            BlockKind::TimerTon { .. } => "timer_ton",
            BlockKind::TimerTof { .. } => "timer_tof",
            BlockKind::TimerTp { .. } => "timer_tp",
            BlockKind::CounterUp { .. } => "counter_up",
            BlockKind::CounterDown { .. } => "counter_down",
            BlockKind::FbAdd { .. } => "fb_add",
            BlockKind::FbSub { .. } => "fb_sub",
            BlockKind::FbMul { .. } => "fb_mul",
            BlockKind::FbDiv { .. } => "fb_div",
            BlockKind::FbMod { .. } => "fb_mod",
            BlockKind::FbNeg { .. } => "fb_neg",
            BlockKind::FbAbs { .. } => "fb_abs",
            BlockKind::FbInc { .. } => "fb_inc",
            BlockKind::FbDec { .. } => "fb_dec",
            BlockKind::FbEq { .. } => "fb_eq",
            BlockKind::FbNeq { .. } => "fb_neq",
            BlockKind::FbGt { .. } => "fb_gt",
            BlockKind::FbLt { .. } => "fb_lt",
            BlockKind::FbGte { .. } => "fb_gte",
            BlockKind::FbLte { .. } => "fb_lte",
            BlockKind::FbMove { .. } => "fb_move",
        }
    }

    /// Memory symbol named by this block, if any. Used for diagnostic
    /// messages.
    pub fn symbol(&self) -> Option<&str> {
        match self {
            BlockKind::Contact { symbol, .. }
            | BlockKind::Coil { symbol, .. }
            | BlockKind::CoilSet { symbol, .. }
            | BlockKind::CoilRset { symbol, .. }
            | BlockKind::TimerTon { symbol, .. }
            | BlockKind::TimerTof { symbol, .. }
            | BlockKind::TimerTp { symbol, .. }
            | BlockKind::CounterUp { symbol, .. }
            | BlockKind::CounterDown { symbol, .. }
            | BlockKind::FbInc { symbol, .. }
            | BlockKind::FbDec { symbol, .. } => Some(symbol),
            BlockKind::FbAdd { symbol, .. }
            | BlockKind::FbSub { symbol, .. }
            | BlockKind::FbMul { symbol, .. }
            | BlockKind::FbDiv { symbol, .. }
            | BlockKind::FbMod { symbol, .. }
            | BlockKind::FbNeg { symbol, .. }
            | BlockKind::FbAbs { symbol, .. } => symbol.as_deref(),
            _ => None,
        }
    }

    /// Render this block as an IR leaf element. `symbol` becomes `address`
    /// and the `fb_*` spellings become their emitted `math_*` / `inc` /
    /// `dec` / `compare_*` / `move` counterparts.
    pub fn to_element(&self) -> Element {
        match self.clone() {
            BlockKind::Contact {
                symbol,
                inverted,
                trigger,
            } => Element::Contact {
                address: symbol,
                inverted,
                trigger,
            },
            BlockKind::Coil { symbol, inverted } => Element::Coil {
                address: symbol,
                inverted,
            },
            BlockKind::CoilSet { symbol, inverted } => Element::CoilSet {
                address: symbol,
                inverted,
            },
            BlockKind::CoilRset { symbol, inverted } => Element::CoilRset {
                address: symbol,
                inverted,
            },
            BlockKind::TimerTon { symbol, preset } => Element::TimerTon {
                address: symbol,
                preset,
            },
            BlockKind::TimerTof { symbol, preset } => Element::TimerTof {
                address: symbol,
                preset,
            },
            BlockKind::TimerTp { symbol, preset } => Element::TimerTp {
                address: symbol,
                preset,
            },
            BlockKind::CounterUp { symbol, preset } => Element::CounterUp {
                address: symbol,
                preset,
            },
            BlockKind::CounterDown { symbol, preset } => Element::CounterDown {
                address: symbol,
                preset,
            },
            BlockKind::FbAdd {
                data_type,
                symbol,
                in1,
                in2,
                out,
            } => Element::MathAdd {
                data_type,
                address: symbol,
                in1,
                in2,
                out,
            },
            BlockKind::FbSub {
                data_type,
                symbol,
                in1,
                in2,
                out,
            } => Element::MathSub {
                data_type,
                address: symbol,
                in1,
                in2,
                out,
            },
            BlockKind::FbMul {
                data_type,
                symbol,
                in1,
                in2,
                out,
            } => Element::MathMul {
                data_type,
                address: symbol,
                in1,
                in2,
                out,
            },
            BlockKind::FbDiv {
                data_type,
                symbol,
                in1,
                in2,
                out,
            } => Element::MathDiv {
                data_type,
                address: symbol,
                in1,
                in2,
                out,
            },
            BlockKind::FbMod {
                data_type,
                symbol,
                in1,
                in2,
                out,
            } => Element::MathMod {
                data_type,
                address: symbol,
                in1,
                in2,
                out,
            },
            BlockKind::FbNeg {
                data_type,
                symbol,
                in1,
                out,
            } => Element::MathNeg {
                data_type,
                address: symbol,
                in1,
                out,
            },
            BlockKind::FbAbs {
                data_type,
                symbol,
                in1,
                out,
            } => Element::MathAbs {
                data_type,
                address: symbol,
                in1,
                out,
            },
            BlockKind::FbInc { data_type, symbol } => Element::Inc {
                data_type,
                address: symbol,
            },
            BlockKind::FbDec { data_type, symbol } => Element::Dec {
                data_type,
                address: symbol,
            },
            BlockKind::FbEq {
                data_type,
                in1,
                in2,
            } => Element::CompareEq {
                data_type,
                in1,
                in2,
            },
            BlockKind::FbNeq {
                data_type,
                in1,
                in2,
            } => Element::CompareNeq {
                data_type,
                in1,
                in2,
            },
            BlockKind::FbGt {
                data_type,
                in1,
                in2,
            } => Element::CompareGt {
                data_type,
                in1,
                in2,
            },
            BlockKind::FbLt {
                data_type,
                in1,
                in2,
            } => Element::CompareLt {
                data_type,
                in1,
                in2,
            },
            BlockKind::FbGte {
                data_type,
                in1,
                in2,
            } => Element::CompareGte {
                data_type,
                in1,
                in2,
            },
            BlockKind::FbLte {
                data_type,
                in1,
                in2,
            } => Element::CompareLte {
                data_type,
                in1,
                in2,
            },
            BlockKind::FbMove {
                data_type,
                in1,
                out,
            } => Element::Move {
                data_type,
                in1,
                out,
            },
        }
    }
}

// ─── Wires ────────────────────────────────────────────────────

/// One endpoint of a wire. Deserializes from either a bare id string or
/// an `{id: "..."}` object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireEndRepr", into = "WireEndRepr")]
pub struct WireEnd {
    pub id: String,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireEndRepr {
    Bare(String),
    Object { id: String },
}

impl From<WireEndRepr> for WireEnd {
    fn from(repr: WireEndRepr) -> Self {
        match repr {
            WireEndRepr::Bare(id) | WireEndRepr::Object { id } => WireEnd { id },
        }
    }
}

impl From<WireEnd> for WireEndRepr {
    fn from(end: WireEnd) -> Self {
        WireEndRepr::Object { id: end.id }
    }
}

/// A directed wire. Power flows source → destination; a well-formed wire
/// has `from` at a strictly smaller grid x than `to`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub from: WireEnd,
    pub to: WireEnd,
}

impl Wire {
    pub fn between(from: &str, to: &str) -> Self {
        Wire {
            id: None,
            from: WireEnd {
                id: from.to_string(),
            },
            to: WireEnd { id: to.to_string() },
        }
    }
}

// ─── Ladder ───────────────────────────────────────────────────

/// The compiler input: an ordered block list, an ordered wire list, and
/// the name/comment strings used as rung labels. The compiler treats it
/// as immutable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Ladder {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub wires: Vec<Wire>,
}

impl Ladder {
    /// Deserialize a ladder from its JSON encoding.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// ─── Preset duration grammar ──────────────────────────────────

/// Failure to parse a timer preset duration.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum PresetError {
    #[error("preset must start with 'T#'")]
    MissingPrefix,
    #[error("preset has no duration components")]
    Empty,
    #[error("invalid number in preset component '{0}'")]
    BadNumber(String),
    #[error("unknown duration unit '{0}' (expected H, M, S or MS)")]
    BadUnit(String),
    #[error("preset must total at least 1 ms")]
    TooShort,
}

/// Parse a `T#` preset duration string and return its total milliseconds.
///
/// Grammar: `T#` followed by one or more `number unit` components, where
/// unit is H, M, S or MS (case-insensitive) and number may carry a decimal
/// fraction. The total must be at least 1 ms.
pub fn parse_preset_duration(preset: &str) -> Result<f64, PresetError> {
    let upper = preset.trim().to_ascii_uppercase();
    let rest = upper.strip_prefix("T#").ok_or(PresetError::MissingPrefix)?;
    if rest.is_empty() {
        return Err(PresetError::Empty);
    }

    let mut total_ms = 0.0f64;
    let mut chars = rest.char_indices().peekable();
    while let Some(&(start, _)) = chars.peek() {
        let mut end = start;
        while let Some(&(i, c)) = chars.peek() {
            if c.is_ascii_digit() || c == '.' {
                end = i + c.len_utf8();
                chars.next();
            } else {
                break;
            }
        }
        let number = &rest[start..end];
        if number.is_empty() {
            // unit with no leading number, e.g. "T#MS"
            let tail: String = rest[start..].to_string();
            return Err(PresetError::BadNumber(tail));
        }
        let value: f64 = number
            .parse()
            .map_err(|_| PresetError::BadNumber(number.to_string()))?;

        let mut unit_end = end;
        while let Some(&(i, c)) = chars.peek() {
            if c.is_ascii_alphabetic() {
                unit_end = i + c.len_utf8();
                chars.next();
            } else {
                break;
            }
        }
        let unit = &rest[end..unit_end];
        let factor = match unit {
            "H" => 3_600_000.0,
            "M" => 60_000.0,
            "S" => 1_000.0,
            "MS" => 1.0,
            _ => return Err(PresetError::BadUnit(unit.to_string())),
        };
        total_ms += value * factor;
    }

    if total_ms < 1.0 {
        return Err(PresetError::TooShort);
    }
    Ok(total_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_components_accumulate() {
        assert_eq!(parse_preset_duration("T#500ms").unwrap(), 500.0);
        assert_eq!(parse_preset_duration("T#1.5s").unwrap(), 1500.0);
        assert_eq!(parse_preset_duration("T#2m30s").unwrap(), 150_000.0);
        assert_eq!(parse_preset_duration("T#1h").unwrap(), 3_600_000.0);
        assert_eq!(parse_preset_duration("t#10S").unwrap(), 10_000.0);
    }

    #[test]
    fn preset_grammar_rejections() {
        assert_eq!(
            parse_preset_duration("500ms"),
            Err(PresetError::MissingPrefix)
        );
        assert_eq!(parse_preset_duration("T#"), Err(PresetError::Empty));
        assert_eq!(parse_preset_duration("T#0.5ms"), Err(PresetError::TooShort));
        assert!(matches!(
            parse_preset_duration("T#5x"),
            Err(PresetError::BadUnit(_))
        ));
        assert!(matches!(
            parse_preset_duration("T#ms"),
            Err(PresetError::BadNumber(_))
        ));
        assert!(matches!(
            parse_preset_duration("T#1..2s"),
            Err(PresetError::BadNumber(_))
        ));
    }

    #[test]
    fn block_deserializes_with_flattened_kind() {
        let block: Block = serde_json::from_str(
            r#"{"id":"a","x":0,"y":0,"kind":"contact","symbol":"X0"}"#,
        )
        .unwrap();
        assert_eq!(
            block.kind,
            BlockKind::Contact {
                symbol: "X0".to_string(),
                inverted: false,
                trigger: Trigger::Normal,
            }
        );
    }

    #[test]
    fn legacy_counter_spellings_normalize() {
        for spelling in ["counter_up", "counter_u", "counter_ctu"] {
            let json = format!(r#"{{"id":"c","x":1,"y":0,"kind":"{spelling}","symbol":"C0","preset":10}}"#);
            let block: Block = serde_json::from_str(&json).unwrap();
            assert!(matches!(block.kind, BlockKind::CounterUp { .. }));
        }
        let block: Block = serde_json::from_str(
            r#"{"id":"c","x":1,"y":0,"kind":"counter_ctd","symbol":"C1","preset":3}"#,
        )
        .unwrap();
        assert!(matches!(block.kind, BlockKind::CounterDown { .. }));
    }

    #[test]
    fn wire_end_accepts_both_encodings() {
        let wire: Wire = serde_json::from_str(r#"{"from":"a","to":{"id":"b"}}"#).unwrap();
        assert_eq!(wire.from.id, "a");
        assert_eq!(wire.to.id, "b");
    }

    #[test]
    fn action_predicate_covers_coils_and_non_compare_fbs() {
        let coil = BlockKind::Coil {
            symbol: "Y0".to_string(),
            inverted: false,
        };
        let add = BlockKind::FbAdd {
            data_type: DataType::I16,
            symbol: None,
            in1: None,
            in2: None,
            out: None,
        };
        let cmp = BlockKind::FbEq {
            data_type: DataType::I16,
            in1: "D0".to_string(),
            in2: "D1".to_string(),
        };
        let timer = BlockKind::TimerTon {
            symbol: "T0".to_string(),
            preset: "T#1s".to_string(),
        };
        assert!(coil.is_action());
        assert!(add.is_action());
        assert!(!cmp.is_action());
        assert!(!timer.is_action());
    }
}
