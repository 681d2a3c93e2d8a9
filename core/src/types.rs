use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role attached to every outbound content block
pub const USER_ROLE: &str = "user";

/// Request body sent through the relay to `generateContent`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

/// Content structure for requests
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

/// Part structure for a piece of content
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

/// Base64 attachment embedded directly in a request part
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
    pub file_name: String,
    pub is_image: bool,
}

impl Part {
    pub fn text(text: String) -> Self {
        Self {
            text: Some(text),
            inline_data: None,
        }
    }

    pub fn inline_data(inline_data: InlineData) -> Self {
        Self {
            text: None,
            inline_data: Some(inline_data),
        }
    }
}

impl GenerateContentRequest {
    /// Single-turn request: the user text, then at most one inline attachment.
    pub fn single_turn(text: String, inline_data: Option<InlineData>) -> Self {
        let mut parts = vec![Part::text(text)];
        if let Some(data) = inline_data {
            parts.push(Part::inline_data(data));
        }

        Self {
            contents: vec![Content {
                role: USER_ROLE.to_string(),
                parts,
            }],
        }
    }
}

/// Pulls `candidates[0].content.parts[0].text` out of a response body.
///
/// When the path is missing the compact JSON serialization of the whole body
/// is returned instead, so an unexpected shape still produces visible text.
pub fn extract_reply_text(body: &Value) -> String {
    match body
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
    {
        Some(text) => text.to_string(),
        None => body.to_string(),
    }
}

/// Pulls a human-readable message out of an error body.
///
/// Accepts the upstream shape `{"error": {"message": ...}}` and the relay's
/// own envelope `{"error": "..."}`.
pub fn extract_error_message(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    match error {
        Value::String(message) => Some(message.clone()),
        Value::Object(_) => error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_matches_wire_shape() {
        let request = GenerateContentRequest::single_turn(
            "describe this".to_string(),
            Some(InlineData {
                mime_type: "image/png".to_string(),
                data: "iVBORw0KGgo=".to_string(),
                file_name: "cat.png".to_string(),
                is_image: true,
            }),
        );

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        {"text": "describe this"},
                        {"inlineData": {
                            "mimeType": "image/png",
                            "data": "iVBORw0KGgo=",
                            "fileName": "cat.png",
                            "isImage": true
                        }}
                    ]
                }]
            })
        );
    }

    #[test]
    fn text_only_payload_has_one_part() {
        let request = GenerateContentRequest::single_turn("hello".to_string(), None);
        assert_eq!(request.contents.len(), 1);
        assert_eq!(request.contents[0].parts, vec![Part::text("hello".into())]);
    }

    #[test]
    fn extracts_first_candidate_text() {
        let body = json!({"candidates":[{"content":{"parts":[{"text":"hi there"}]}}]});
        assert_eq!(extract_reply_text(&body), "hi there");
    }

    #[test]
    fn unexpected_shape_falls_back_to_raw_json() {
        let body = json!({"unexpected": "shape"});
        assert_eq!(extract_reply_text(&body), r#"{"unexpected":"shape"}"#);
    }

    #[test]
    fn error_message_shapes() {
        assert_eq!(
            extract_error_message(&json!({"error": {"message": "quota exceeded"}})),
            Some("quota exceeded".to_string())
        );
        assert_eq!(
            extract_error_message(&json!({"error": "connection refused"})),
            Some("connection refused".to_string())
        );
        assert_eq!(extract_error_message(&json!({"error": {"code": 5}})), None);
        assert_eq!(extract_error_message(&json!({"other": 1})), None);
    }
}
