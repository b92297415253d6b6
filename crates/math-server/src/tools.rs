//! Arithmetic tools
//!
//! Integer inputs stay integers for `add`, `subtract` and `multiply` unless
//! the result overflows; `divide` always produces a float.

use serde_json::{Map, Value, json};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    Unknown(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// The tool ran and failed; reported to the caller as an error result
    #[error("{0}")]
    Execution(String),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn from_value(value: &Value) -> Option<Self> {
        value
            .as_i64()
            .map(Self::Int)
            .or_else(|| value.as_f64().map(Self::Float))
    }

    #[allow(clippy::cast_precision_loss)]
    const fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    pub fn to_value(self) -> Value {
        match self {
            Self::Int(i) => Value::from(i),
            Self::Float(f) => Value::from(f),
        }
    }
}

/// Tool names with their descriptions, in advertised order
const TOOLS: &[(&str, &str)] = &[
    ("add", "Add two numbers."),
    ("subtract", "Subtract two numbers."),
    ("multiply", "Multiply two numbers."),
    ("divide", "Divide two numbers."),
];

/// `tools/list` entries
pub fn descriptors() -> Vec<Value> {
    TOOLS
        .iter()
        .map(|(name, description)| {
            json!({
                "name": name,
                "description": description,
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "a": { "type": "number" },
                        "b": { "type": "number" }
                    },
                    "required": ["a", "b"]
                }
            })
        })
        .collect()
}

fn operand(tool: &str, args: &Map<String, Value>, key: &str) -> Result<Number, ToolError> {
    let value = args.get(key).ok_or_else(|| ToolError::InvalidArguments {
        tool: tool.to_string(),
        reason: format!("missing argument '{key}'"),
    })?;
    Number::from_value(value).ok_or_else(|| ToolError::InvalidArguments {
        tool: tool.to_string(),
        reason: format!("argument '{key}' must be a number, got {value}"),
    })
}

fn integer_or_float(
    a: Number,
    b: Number,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Number {
    if let (Number::Int(x), Number::Int(y)) = (a, b) {
        if let Some(result) = int_op(x, y) {
            return Number::Int(result);
        }
    }
    Number::Float(float_op(a.as_f64(), b.as_f64()))
}

/// Run a tool by name
pub fn call(name: &str, args: &Map<String, Value>) -> Result<Number, ToolError> {
    if !TOOLS.iter().any(|(tool, _)| *tool == name) {
        return Err(ToolError::Unknown(name.to_string()));
    }
    let a = operand(name, args, "a")?;
    let b = operand(name, args, "b")?;

    let result = match name {
        "add" => integer_or_float(a, b, i64::checked_add, |x, y| x + y),
        "subtract" => integer_or_float(a, b, i64::checked_sub, |x, y| x - y),
        "multiply" => integer_or_float(a, b, i64::checked_mul, |x, y| x * y),
        _ => {
            let divisor = b.as_f64();
            if divisor == 0.0 {
                return Err(ToolError::Execution("Cannot divide by zero.".into()));
            }
            Number::Float(a.as_f64() / divisor)
        }
    };
    Ok(result)
}
