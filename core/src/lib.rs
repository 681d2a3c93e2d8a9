// Client-side chat functionality:
// - Wire types for the generateContent payload
// - Conversation history persistence
// - Relay client and the response pipeline
// - Markdown rendering for replies

pub mod attachment;

pub mod client;
pub use client::{RelayClient, RelayTransport};

pub mod config;
pub use config::ClientConfig;

pub mod errors;
pub use errors::*;

pub mod history;
pub use history::{Attachment, HistoryStore, Role, Turn};

pub mod markdown;

pub mod pipeline;
pub use pipeline::{ChatSession, InFlight, InFlightPermit, PipelineState};

pub mod reveal;

pub mod types;
pub use types::*;

pub mod view;
pub use view::ChatView;
