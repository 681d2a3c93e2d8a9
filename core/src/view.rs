use crate::pipeline::PipelineState;

/// Rendering surface driven by a chat cycle.
///
/// Methods take `&self` so one view can be shared with a spawned cycle task;
/// implementations keep their own interior mutability.
pub trait ChatView: Send + Sync {
    /// Shown as soon as the user turn is persisted, before the network answers.
    fn show_placeholder(&self);

    /// Called once per revealed token with the token and the full text so far.
    fn reveal(&self, token: &str, revealed: &str);

    /// Replaces the placeholder with the rendered reply.
    fn finish(&self, text: &str);

    fn show_error(&self, message: &str);

    fn set_status(&self, state: PipelineState);
}
