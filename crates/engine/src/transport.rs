//! Frames and their wire encodings.
//!
//! The orchestrator declares each frame's type when it produces it, so
//! consumers never infer a payload's shape. Every encoded frame is a
//! self-contained JSON object: `{"type": "content" | "report" |
//! "citations", "data": ...}`.

use crate::citations::Citation;
use crate::report::DecisionReport;
use govbrief_core::AppResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Frame {
    /// Incremental text; consumers append
    Content(String),
    /// A complete decision report, sent at most once
    Report(Box<DecisionReport>),
    /// Sources for the response, always the last frame of a success
    Citations(Vec<Citation>),
}

impl Frame {
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Content(_) => "content",
            Frame::Report(_) => "report",
            Frame::Citations(_) => "citations",
        }
    }
}

/// Serializes frames into text units for a byte stream.
pub trait FrameEncoder: Send + Sync {
    fn content_type(&self) -> &'static str;

    fn encode(&self, frame: &Frame) -> AppResult<String>;
}

/// Server-sent events: `data: <json>\n\n`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SseEncoder;

impl FrameEncoder for SseEncoder {
    fn content_type(&self) -> &'static str {
        "text/event-stream"
    }

    fn encode(&self, frame: &Frame) -> AppResult<String> {
        Ok(format!("data: {}\n\n", serde_json::to_string(frame)?))
    }
}

/// Newline-delimited JSON: `<json>\n`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NdjsonEncoder;

impl FrameEncoder for NdjsonEncoder {
    fn content_type(&self) -> &'static str {
        "application/x-ndjson"
    }

    fn encode(&self, frame: &Frame) -> AppResult<String> {
        Ok(format!("{}\n", serde_json::to_string(frame)?))
    }
}
