// src/mcp/requests.rs
// `complete` arguments and their validation

use serde::Serialize;
use serde_json::{Number, Value};

/// Optional numeric generation parameters, in declaration order
pub const NUMERIC_FIELDS: [&str; 5] = [
    "max_tokens",
    "temperature",
    "top_p",
    "frequency_penalty",
    "presence_penalty",
];

/// Validated `complete` arguments. Unset fields fall back to process defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub prompt: String,
    pub max_tokens: Option<Number>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub frequency_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }
}

/// Check untyped arguments and narrow them to a `CompletionRequest`.
///
/// Requires an object whose `prompt` is a string; each optional numeric field,
/// when present, must be a JSON number (null counts as present). Unknown keys
/// are ignored and no range checks are made. The error names the offending field.
pub fn validate_request(value: &Value) -> Result<CompletionRequest, String> {
    let Some(args) = value.as_object() else {
        return Err("arguments must be an object".to_string());
    };

    let prompt = match args.get("prompt") {
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err("prompt must be a string".to_string()),
        None => return Err("prompt is required".to_string()),
    };

    for field in NUMERIC_FIELDS {
        if let Some(v) = args.get(field)
            && !v.is_number()
        {
            return Err(format!("{} must be a number", field));
        }
    }

    let number = |field: &str| match args.get(field) {
        Some(Value::Number(n)) => Some(n.clone()),
        _ => None,
    };
    let float = |field: &str| number(field).and_then(|n| n.as_f64());

    Ok(CompletionRequest {
        prompt,
        max_tokens: number("max_tokens"),
        temperature: float("temperature"),
        top_p: float("top_p"),
        frequency_penalty: float("frequency_penalty"),
        presence_penalty: float("presence_penalty"),
    })
}

/// Boolean form of `validate_request`
pub fn is_completion_request(value: &Value) -> bool {
    validate_request(value).is_ok()
}
