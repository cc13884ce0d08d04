//! Scripted generation provider.
//!
//! Replays canned responses chunk by chunk. Each `stream` call consumes the
//! next script; once the scripts run out the last one repeats. Output is
//! fully deterministic, which makes it the provider of choice for tests and
//! offline demos.

use crate::client::{LlmClient, LlmRequest, LlmStream, LlmStreamChunk, LlmUsage};
use govbrief_core::{AppError, AppResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const MODEL: &str = "scripted";

/// One scripted reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Script {
    /// Stream this text
    Text(String),
    /// Fail when the stream is opened
    Fail(String),
    /// Stream this text, then fail instead of finishing
    Interrupted(String),
    /// Open a stream that never yields a chunk
    Stalled,
}

impl Script {
    pub fn text(text: impl Into<String>) -> Self {
        Script::Text(text.into())
    }
}

/// Counts live streams; decremented when a stream is dropped.
struct StreamGuard(Arc<AtomicUsize>);

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub struct ScriptedClient {
    scripts: Vec<Script>,
    chunk_chars: usize,
    chunk_delay: Option<Duration>,
    cursor: AtomicUsize,
    requests: Mutex<Vec<LlmRequest>>,
    open_streams: Arc<AtomicUsize>,
}

impl ScriptedClient {
    /// Replay plain text responses.
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_scripts(responses.into_iter().map(|r| Script::Text(r.into())).collect())
    }

    pub fn from_scripts(scripts: Vec<Script>) -> Self {
        Self {
            scripts,
            chunk_chars: 16,
            chunk_delay: None,
            cursor: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            open_streams: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Size of each emitted chunk, in characters.
    pub fn with_chunk_chars(mut self, chunk_chars: usize) -> Self {
        self.chunk_chars = chunk_chars.max(1);
        self
    }

    /// Pause before every chunk, to simulate a slow provider.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Number of `stream` calls made.
    pub fn call_count(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }

    /// Streams opened and not yet dropped.
    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }

    fn open_guard(&self) -> StreamGuard {
        self.open_streams.fetch_add(1, Ordering::SeqCst);
        StreamGuard(Arc::clone(&self.open_streams))
    }

    fn next_script(&self) -> Option<Script> {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        self.scripts
            .get(index)
            .or_else(|| self.scripts.last())
            .cloned()
    }
}

/// Split text into pieces of at most `size` characters.
fn split_chunks(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size)
        .map(|piece| piece.iter().collect())
        .collect()
}

#[async_trait::async_trait]
impl LlmClient for ScriptedClient {
    fn provider_name(&self) -> &str {
        MODEL
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let (text, interrupted) = match self.next_script() {
            None => return Err(AppError::Llm("No scripted responses configured".to_string())),
            Some(Script::Fail(message)) => return Err(AppError::Llm(message)),
            Some(Script::Text(text)) => (text, false),
            Some(Script::Interrupted(text)) => (text, true),
            Some(Script::Stalled) => {
                tracing::debug!("Replaying a stalled stream");
                let stream = futures::stream::unfold(self.open_guard(), |guard| async move {
                    futures::future::pending::<()>().await;
                    Some((Ok::<_, AppError>(LlmStreamChunk::text("", MODEL)), guard))
                });
                return Ok(Box::pin(stream));
            }
        };

        tracing::debug!("Replaying scripted response ({} chars)", text.len());

        let pieces = split_chunks(&text, self.chunk_chars);
        let completion_tokens = pieces.len() as u32;
        let prompt_tokens = request.prompt.split_whitespace().count() as u32;

        let guard = self.open_guard();
        let delay = self.chunk_delay;

        let state = (pieces.into_iter(), guard, false);
        let stream = futures::stream::unfold(state, move |(mut pieces, guard, finished)| async move {
            if finished {
                return None;
            }
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let item = match pieces.next() {
                Some(piece) => Ok(LlmStreamChunk::text(piece, MODEL)),
                None if interrupted => {
                    let err = AppError::Llm("Scripted stream interrupted".to_string());
                    return Some((Err(err), (pieces, guard, true)));
                }
                None => {
                    let last = LlmStreamChunk {
                        content: String::new(),
                        model: MODEL.to_string(),
                        done: true,
                        usage: Some(LlmUsage::new(prompt_tokens, completion_tokens)),
                    };
                    return Some((Ok(last), (pieces, guard, true)));
                }
            };

            Some((item, (pieces, guard, false)))
        });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_split_chunks_is_char_aware() {
        assert_eq!(split_chunks("abcdef", 4), vec!["abcd", "ef"]);
        assert_eq!(split_chunks("Muranga’s", 8), vec!["Muranga’", "s"]);
        assert!(split_chunks("", 4).is_empty());
    }

    #[tokio::test]
    async fn test_replays_in_order_and_repeats_last() {
        let client = ScriptedClient::new(["first", "second"]);
        let request = LlmRequest::new("q", "m");

        assert_eq!(client.complete(&request).await.unwrap().content, "first");
        assert_eq!(client.complete(&request).await.unwrap().content, "second");
        assert_eq!(client.complete(&request).await.unwrap().content, "second");
        assert_eq!(client.call_count(), 3);
        assert_eq!(client.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_stream_chunks_and_final_marker() {
        let client = ScriptedClient::new(["Hello Nairobi"]).with_chunk_chars(5);
        let chunks: Vec<LlmStreamChunk> = client
            .stream(&LlmRequest::new("q", "m"))
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;

        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(texts, vec!["Hello", " Nair", "obi", ""]);
        assert!(chunks.last().unwrap().done);
    }

    #[tokio::test]
    async fn test_fail_script_errors_on_open() {
        let client = ScriptedClient::from_scripts(vec![Script::Fail("provider down".into())]);
        let err = client.stream(&LlmRequest::new("q", "m")).await.err().unwrap();
        assert!(err.to_string().contains("provider down"));
    }

    #[tokio::test]
    async fn test_stalled_script_never_yields() {
        let client = ScriptedClient::from_scripts(vec![Script::Stalled, Script::text("ok")]);
        let mut stream = client.stream(&LlmRequest::new("q", "m")).await.unwrap();
        let next = tokio::time::timeout(Duration::from_millis(20), stream.next()).await;
        assert!(next.is_err());
        assert_eq!(client.open_streams(), 1);
        drop(stream);
        assert_eq!(client.open_streams(), 0);

        let response = client.complete(&LlmRequest::new("q", "m")).await.unwrap();
        assert_eq!(response.content, "ok");
    }

    #[tokio::test]
    async fn test_open_stream_tracking() {
        let client = ScriptedClient::new(["abc"]);
        let stream = client.stream(&LlmRequest::new("q", "m")).await.unwrap();
        assert_eq!(client.open_streams(), 1);
        drop(stream);
        assert_eq!(client.open_streams(), 0);
    }
}
