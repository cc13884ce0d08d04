//! Generation provider implementations.

pub mod ollama;
pub mod openai;
pub mod scripted;

pub use ollama::OllamaClient;
pub use openai::OpenAiCompatClient;
pub use scripted::{Script, ScriptedClient};

use futures::{Stream, StreamExt};
use govbrief_core::{AppError, AppResult};
use std::fmt::Display;

/// Re-frame a byte stream into trimmed, non-empty text lines.
///
/// Network reads do not respect line boundaries, so partial lines are held
/// back until their terminating newline (or end of stream) arrives.
pub(crate) fn line_stream<S, B, E>(bytes: S) -> impl Stream<Item = AppResult<String>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: Display + Send,
{
    let state = (Box::pin(bytes), Vec::<u8>::new(), false);

    futures::stream::unfold(state, |(mut bytes, mut buf, mut finished)| async move {
        loop {
            if let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buf.drain(..=pos).collect();
                let text = String::from_utf8_lossy(&line).trim().to_string();
                if text.is_empty() {
                    continue;
                }
                return Some((Ok(text), (bytes, buf, finished)));
            }

            if finished {
                let text = String::from_utf8_lossy(&buf).trim().to_string();
                buf.clear();
                if text.is_empty() {
                    return None;
                }
                return Some((Ok(text), (bytes, buf, finished)));
            }

            match bytes.next().await {
                Some(Ok(chunk)) => buf.extend_from_slice(chunk.as_ref()),
                Some(Err(e)) => {
                    buf.clear();
                    finished = true;
                    let err = AppError::Llm(format!("Stream error: {}", e));
                    return Some((Err(err), (bytes, buf, finished)));
                }
                None => finished = true,
            }
        }
    })
}

/// Read an error body from a failed provider response.
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string())
}
