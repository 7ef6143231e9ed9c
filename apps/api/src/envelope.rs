use serde::{Deserialize, Serialize};

/// Uniform response contract returned to every caller, regardless of which
/// backend served the request. Exactly one of `content` / `message` is set:
/// `content` on success, `message` on failure. Absent fields are omitted
/// from the serialized JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Envelope {
    pub fn ok(content: impl Into<String>) -> Self {
        Envelope {
            success: true,
            content: Some(content.into()),
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Envelope {
            success: false,
            content: None,
            message: Some(message.into()),
        }
    }
}
