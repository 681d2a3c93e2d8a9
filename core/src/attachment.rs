use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::Path;
use tracing::debug;

use crate::errors::{ChatError, ChatResult};
use crate::history::Attachment;
use crate::types::InlineData;

/// Request body limit enforced by the relay.
pub const RELAY_BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Room kept in the request body for the prompt text and JSON framing.
pub const ENVELOPE_ALLOWANCE_BYTES: usize = 64 * 1024;

/// Largest file accepted as an attachment. Its base64 form plus the envelope
/// must fit under [`RELAY_BODY_LIMIT_BYTES`].
pub const MAX_ATTACHMENT_BYTES: usize =
    (RELAY_BODY_LIMIT_BYTES - ENVELOPE_ALLOWANCE_BYTES) / 4 * 3;

/// Length of the padded base64 encoding of `len` bytes.
pub fn encoded_len(len: usize) -> usize {
    4 * len.div_ceil(3)
}

impl Attachment {
    /// Reads a file into a data-URI attachment.
    pub fn from_path(path: &Path) -> ChatResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            ChatError::Attachment(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();

        Self::from_bytes(file_name, mime_type, &bytes)
    }

    pub fn from_bytes(file_name: String, mime_type: String, bytes: &[u8]) -> ChatResult<Self> {
        if encoded_len(bytes.len()) + ENVELOPE_ALLOWANCE_BYTES > RELAY_BODY_LIMIT_BYTES {
            return Err(ChatError::Attachment(format!(
                "{} is {} bytes, limit is {}",
                file_name,
                bytes.len(),
                MAX_ATTACHMENT_BYTES
            )));
        }

        debug!(file = %file_name, mime = %mime_type, size = bytes.len(), "Loaded attachment");
        Ok(Self {
            data_url: format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes)),
            is_image: mime_type.starts_with("image/"),
            file_name,
            mime_type,
        })
    }

    /// The base64 payload: everything after the first comma of the data URI.
    pub fn base64_payload(&self) -> &str {
        match self.data_url.split_once(',') {
            Some((_, payload)) => payload,
            None => "",
        }
    }

    pub fn to_inline_data(&self) -> InlineData {
        InlineData {
            mime_type: self.mime_type.clone(),
            data: self.base64_payload().to_string(),
            file_name: self.file_name.clone(),
            is_image: self.is_image,
        }
    }
}
