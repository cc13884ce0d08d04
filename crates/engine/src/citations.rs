//! Citation derivation.
//!
//! Citations come from context membership alone: every passage that was
//! in the window sent to the model is cited once per source, whether or
//! not the generated text mentions it.

use crate::context::ContextWindow;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Always "document" for passage citations
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Rounded to two decimals, within `[0, 1]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f32>,
    /// Id of the cited passage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passage_id: Option<String>,
}

fn round2(value: f32) -> f32 {
    ((value * 100.0).round() / 100.0).clamp(0.0, 1.0)
}

/// Derive citations for a finished generation.
///
/// Order follows the window (highest relevance first); the first passage
/// of each source wins. Citations never depend on `output`: a passage is
/// cited because it was in the context, not because the model named it.
/// `output` is part of the tracker's contract and is only logged here.
pub fn derive_citations(window: &ContextWindow, output: &str) -> Vec<Citation> {
    let mut seen = HashSet::new();
    let citations: Vec<Citation> = window
        .passages()
        .filter(|p| seen.insert(p.source.as_str()))
        .map(|p| Citation {
            kind: "document".to_string(),
            title: p.source.clone(),
            source: Some(format!("Document: {}", p.source)),
            url: p.url.clone(),
            relevance: Some(round2(p.relevance())),
            passage_id: Some(p.id.clone()),
        })
        .collect();

    tracing::debug!(
        citations = citations.len(),
        output_chars = output.len(),
        "Derived citations from context"
    );
    citations
}
