use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

// ─── Scalar vocabulary ────────────────────────────────────────

/// Operand width for function blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

/// Contact edge behavior.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    #[default]
    Normal,
    Rising,
    Falling,
    Change,
}

// ─── Diagnostics ──────────────────────────────────────────────

/// Severity of a compile diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic emitted during compilation.
///
/// Diagnostics carry stable block ids, never grid positions; locating the
/// offender on a canvas is the editor's concern.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub node_ids: Vec<String>,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN",
        };
        if self.node_ids.is_empty() {
            write!(f, "[{}] {}", level, self.message)
        } else {
            write!(f, "[{}] {} ({})", level, self.message, self.node_ids.join(", "))
        }
    }
}

// ─── IR elements ──────────────────────────────────────────────

/// One parallel branch inside an [`Element::Or`] group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub elements: Vec<Element>,
}

/// A single element of a compiled rung.
///
/// Leaf elements carry the originating block's attributes with `symbol`
/// renamed to `address`. `Or` encloses parallel branches; `Tap` marks a
/// point where an action's boolean output also feeds further logic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Element {
    Contact {
        address: String,
        inverted: bool,
        trigger: Trigger,
    },
    Coil {
        address: String,
        inverted: bool,
    },
    CoilSet {
        address: String,
        inverted: bool,
    },
    CoilRset {
        address: String,
        inverted: bool,
    },
    TimerTon {
        address: String,
        preset: String,
    },
    TimerTof {
        address: String,
        preset: String,
    },
    TimerTp {
        address: String,
        preset: String,
    },
    CounterUp {
        address: String,
        preset: i64,
    },
    CounterDown {
        address: String,
        preset: i64,
    },
    MathAdd {
        data_type: DataType,
        #[serde(skip_serializing_if = "Option::is_none")]
        address: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        in1: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        in2: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        out: Option<String>,
    },
    MathSub {
        data_type: DataType,
        #[serde(skip_serializing_if = "Option::is_none")]
        address: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        in1: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        in2: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        out: Option<String>,
    },
    MathMul {
        data_type: DataType,
        #[serde(skip_serializing_if = "Option::is_none")]
        address: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        in1: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        in2: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        out: Option<String>,
    },
    MathDiv {
        data_type: DataType,
        #[serde(skip_serializing_if = "Option::is_none")]
        address: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        in1: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        in2: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        out: Option<String>,
    },
    MathMod {
        data_type: DataType,
        #[serde(skip_serializing_if = "Option::is_none")]
        address: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        in1: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        in2: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        out: Option<String>,
    },
    MathNeg {
        data_type: DataType,
        #[serde(skip_serializing_if = "Option::is_none")]
        address: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        in1: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        out: Option<String>,
    },
    MathAbs {
        data_type: DataType,
        #[serde(skip_serializing_if = "Option::is_none")]
        address: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        in1: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        out: Option<String>,
    },
    Inc {
        data_type: DataType,
        address: String,
    },
    Dec {
        data_type: DataType,
        address: String,
    },
    CompareEq {
        data_type: DataType,
        in1: String,
        in2: String,
    },
    CompareNeq {
        data_type: DataType,
        in1: String,
        in2: String,
    },
    CompareGt {
        data_type: DataType,
        in1: String,
        in2: String,
    },
    CompareLt {
        data_type: DataType,
        in1: String,
        in2: String,
    },
    CompareGte {
        data_type: DataType,
        in1: String,
        in2: String,
    },
    CompareLte {
        data_type: DataType,
        in1: String,
        in2: String,
    },
    Move {
        data_type: DataType,
        in1: String,
        out: String,
    },
    Or {
        branches: Vec<Branch>,
    },
    Tap,
}

// ─── Rungs and compile output ─────────────────────────────────

/// One horizontal line of the compiled program.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rung {
    pub comment: String,
    pub elements: Vec<Element>,
}

/// The output of one `compile` call: the rung list plus every diagnostic
/// accumulated along the way. An empty rung list with a populated error
/// list is a valid outcome.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledLadder {
    pub rungs: Vec<Rung>,
    pub errors: Vec<Diagnostic>,
}

/// Opening line marker for the on-wire framing.
pub const BLOCK_START_MARKER: &str = "// ladder_block_start";

/// Closing line marker for the on-wire framing.
pub const BLOCK_END_MARKER: &str = "// ladder_block_end";

impl CompiledLadder {
    /// True if any diagnostic has error severity. Hosts treat this as a
    /// compile failure but may still display the partial rung list.
    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(|d| d.severity == Severity::Error)
    }

    /// JSON-encode the output and wrap it between the literal block
    /// markers, each marker line followed by a newline. Downstream stages
    /// extract the IR from a concatenated compilation unit by scanning for
    /// these markers.
    pub fn to_framed_json(&self) -> Result<String> {
        let body = serde_json::to_string(self)?;
        Ok(format!(
            "{}\n{}\n{}\n",
            BLOCK_START_MARKER, body, BLOCK_END_MARKER
        ))
    }
}

/// Extract the JSON payloads framed by the block markers from a
/// concatenated compilation unit. Payload lines between a start and end
/// marker are returned verbatim.
pub fn extract_framed_blocks(unit: &str) -> Result<Vec<String>> {
    let mut blocks = Vec::new();
    let mut current: Option<Vec<&str>> = None;
    for line in unit.lines() {
        match line {
            BLOCK_START_MARKER => {
                if current.is_some() {
                    return Err(anyhow!("nested ladder block start marker"));
                }
                current = Some(Vec::new());
            }
            BLOCK_END_MARKER => match current.take() {
                Some(body) => blocks.push(body.join("\n")),
                None => return Err(anyhow!("ladder block end marker without start")),
            },
            _ => {
                if let Some(body) = current.as_mut() {
                    body.push(line);
                }
            }
        }
    }
    if current.is_some() {
        return Err(anyhow!("unterminated ladder block"));
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_serializes_with_kind_tag() {
        let el = Element::Contact {
            address: "X0".to_string(),
            inverted: false,
            trigger: Trigger::Normal,
        };
        let json = serde_json::to_value(&el).unwrap();
        assert_eq!(json["kind"], "contact");
        assert_eq!(json["address"], "X0");
        assert_eq!(json["trigger"], "normal");

        let tap = serde_json::to_value(Element::Tap).unwrap();
        assert_eq!(tap["kind"], "tap");
    }

    #[test]
    fn math_element_omits_absent_operands() {
        let el = Element::MathAdd {
            data_type: DataType::I16,
            address: None,
            in1: Some("D0".to_string()),
            in2: Some("D1".to_string()),
            out: Some("D2".to_string()),
        };
        let json = serde_json::to_value(&el).unwrap();
        assert_eq!(json["kind"], "math_add");
        assert_eq!(json["data_type"], "i16");
        assert!(json.get("address").is_none());
    }

    #[test]
    fn framing_is_byte_exact() {
        let out = CompiledLadder {
            rungs: vec![],
            errors: vec![],
        };
        let framed = out.to_framed_json().unwrap();
        assert!(framed.starts_with("// ladder_block_start\n"));
        assert!(framed.ends_with("// ladder_block_end\n"));
    }

    #[test]
    fn framed_blocks_round_trip_through_a_compilation_unit() {
        let out = CompiledLadder {
            rungs: vec![],
            errors: vec![],
        };
        let framed = out.to_framed_json().unwrap();
        let unit = format!("; prologue\n{framed}; epilogue\n{framed}");

        let payloads = extract_framed_blocks(&unit).unwrap();
        assert_eq!(payloads.len(), 2);
        let parsed: CompiledLadder = serde_json::from_str(&payloads[0]).unwrap();
        assert_eq!(parsed, out);
    }

    #[test]
    fn unterminated_block_is_rejected() {
        let unit = "// ladder_block_start\n{}\n";
        assert!(extract_framed_blocks(unit).is_err());
    }
}
