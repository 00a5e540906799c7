use crate::error::DispatchError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Pixel-space bounding box of one detection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Detection {
    pub id: u32,
    pub class_id: i64,
    pub class_name: String,
    pub confidence: f64,
    pub bbox: BBox,
}

/// Normalized view of an inference response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredictionSummary {
    /// Object detector output; the list may be empty
    Detections {
        count: usize,
        detections: Vec<Detection>,
    },
    /// Classifier-style output
    Label {
        label: String,
        confidence: Option<f64>,
    },
    /// A successful response with no recognizable result fields
    Unstructured,
}

impl PredictionSummary {
    /// Short form for log lines
    pub fn describe(&self) -> String {
        match self {
            PredictionSummary::Detections { count, detections } => {
                let mut classes: Vec<&str> =
                    detections.iter().map(|d| d.class_name.as_str()).collect();
                classes.sort_unstable();
                classes.dedup();
                format!("{} detections [{}]", count, classes.join(", "))
            }
            PredictionSummary::Label { label, confidence } => match confidence {
                Some(c) => format!("{} ({:.2})", label, c),
                None => label.clone(),
            },
            PredictionSummary::Unstructured => "unstructured result".to_string(),
        }
    }
}

const LABEL_FIELDS: [&str; 3] = ["prediction", "class", "label"];

/// Classify a parsed inference response as success or failure.
///
/// A non-null `error` field or `success: false` is a failure even when the
/// HTTP status was 200, which is how the service reports bad requests.
pub fn interpret_response(body: &Value) -> Result<PredictionSummary, DispatchError> {
    let object = body.as_object().ok_or_else(|| DispatchError::InvalidResponse {
        details: format!("expected a JSON object, got {}", json_kind(body)),
    })?;

    if let Some(error) = object.get("error").filter(|e| !e.is_null()) {
        return Err(DispatchError::ServiceError {
            message: value_text(error),
        });
    }

    if object.get("success") == Some(&Value::Bool(false)) {
        return Err(DispatchError::ServiceError {
            message: "service reported success: false".to_string(),
        });
    }

    if let Some(detections) = object.get("detections") {
        let detections: Vec<Detection> = serde_json::from_value(detections.clone())
            .map_err(|e| DispatchError::InvalidResponse {
                details: format!("malformed detections: {}", e),
            })?;
        return Ok(PredictionSummary::Detections {
            count: detections.len(),
            detections,
        });
    }

    for field in LABEL_FIELDS {
        if let Some(label) = object.get(field).filter(|v| !v.is_null()) {
            return Ok(PredictionSummary::Label {
                label: value_text(label),
                confidence: object.get("confidence").and_then(Value::as_f64),
            });
        }
    }

    Ok(PredictionSummary::Unstructured)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
