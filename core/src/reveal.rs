use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::view::ChatView;

/// Splits text into alternating runs of non-whitespace and whitespace.
///
/// Concatenating the tokens gives back the input exactly.
pub fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_space: Option<bool> = None;

    for (idx, ch) in text.char_indices() {
        let is_space = ch.is_whitespace();
        match in_space {
            Some(prev) if prev != is_space => {
                tokens.push(&text[start..idx]);
                start = idx;
            }
            _ => {}
        }
        in_space = Some(is_space);
    }

    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

/// Reveals `text` into the view one token per `interval`.
///
/// Returns `false` if `cancel` fired before the last token was shown. A zero
/// interval reveals every token without sleeping.
pub async fn reveal<V: ChatView + ?Sized>(
    text: &str,
    interval: Duration,
    cancel: &CancellationToken,
    view: &V,
) -> bool {
    let mut revealed = String::with_capacity(text.len());

    for token in tokenize(text) {
        if !interval.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return false,
                _ = tokio::time::sleep(interval) => {}
            }
        } else if cancel.is_cancelled() {
            return false;
        }

        revealed.push_str(token);
        view.reveal(token, &revealed);
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineState;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Frames(Mutex<Vec<String>>);

    impl ChatView for Frames {
        fn show_placeholder(&self) {}
        fn reveal(&self, _token: &str, revealed: &str) {
            self.0.lock().unwrap().push(revealed.to_string());
        }
        fn finish(&self, _text: &str) {}
        fn show_error(&self, _message: &str) {}
        fn set_status(&self, _state: PipelineState) {}
    }

    #[test]
    fn tokenize_alternates_words_and_whitespace() {
        assert_eq!(
            tokenize("hi  there\nfriend"),
            vec!["hi", "  ", "there", "\n", "friend"]
        );
        assert_eq!(tokenize(" lead"), vec![" ", "lead"]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn tokenize_is_lossless() {
        let text = "  code:\n\t```rust\nfn main() {}\n```  é ü ";
        assert_eq!(tokenize(text).concat(), text);
    }

    #[tokio::test(start_paused = true)]
    async fn reveals_every_prefix() {
        let view = Frames::default();
        let token = CancellationToken::new();

        let done = reveal("hi there", Duration::from_millis(18), &token, &view).await;

        assert!(done);
        assert_eq!(*view.0.lock().unwrap(), vec!["hi", "hi ", "hi there"]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_reveal() {
        let view = Frames::default();
        let token = CancellationToken::new();
        let cancel = token.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            cancel.cancel();
        });

        let done = reveal("a b c d e f", Duration::from_millis(18), &token, &view).await;

        assert!(!done);
        assert_eq!(view.0.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn zero_interval_reveals_immediately() {
        let view = Frames::default();
        let done = reveal("one two", Duration::ZERO, &CancellationToken::new(), &view).await;
        assert!(done);
        assert_eq!(view.0.lock().unwrap().last().unwrap(), "one two");
    }
}
