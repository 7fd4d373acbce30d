//! Streaming reply consumption with cooperative cancellation.

use notechat_core::cancel::CancellationToken;
use notechat_core::error::ProviderError;
use notechat_core::provider::{StreamReceiver, Usage};
use tracing::debug;

/// What a consumed stream produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamOutcome {
    /// Concatenation of every delta delivered to the callback.
    pub text: String,
    /// Whether consumption stopped because the token was cancelled.
    pub cancelled: bool,
    /// Usage reported by the provider, usually on the final chunk.
    pub usage: Option<Usage>,
}

/// Drain `rx`, handing each text delta to `on_delta`.
///
/// The cancellation flag is checked each time an increment arrives and
/// before it is delivered. Once set, no further deltas reach the callback.
/// Ends on a `done` chunk, on channel close, or on the first stream error,
/// which is returned as is.
pub async fn consume_stream<F>(
    mut rx: StreamReceiver,
    cancel: &CancellationToken,
    mut on_delta: F,
) -> Result<StreamOutcome, ProviderError>
where
    F: FnMut(&str),
{
    let mut outcome = StreamOutcome::default();

    if cancel.is_cancelled() {
        outcome.cancelled = true;
        return Ok(outcome);
    }

    while let Some(chunk_result) = rx.recv().await {
        if cancel.is_cancelled() {
            outcome.cancelled = true;
            break;
        }

        let chunk = chunk_result?;

        if let Some(ref text) = chunk.content
            && !text.is_empty()
        {
            outcome.text.push_str(text);
            on_delta(text);
        }

        if chunk.usage.is_some() {
            outcome.usage = chunk.usage;
        }

        if chunk.done {
            break;
        }
    }

    debug!(
        chars = outcome.text.chars().count(),
        cancelled = outcome.cancelled,
        "Stream consumed"
    );

    Ok(outcome)
}
