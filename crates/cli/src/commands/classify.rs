//! Classify command handler.

use clap::Args;
use govbrief_core::{config::AppConfig, AppResult};
use govbrief_engine::QueryClassifier;

/// Show how a question would be classified
#[derive(Args, Debug)]
pub struct ClassifyCommand {
    /// The question to classify
    pub question: String,
}

impl ClassifyCommand {
    /// Execute the classify command.
    ///
    /// Uses only the classifier settings, so no provider or store is needed.
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let classifier = QueryClassifier::new(&config.classifier);
        let classification = classifier.classify(&self.question)?;

        tracing::debug!(
            kind = %classification.kind,
            confidence = classification.confidence,
            "Classified question"
        );

        println!("{}", serde_json::to_string_pretty(&classification)?);
        Ok(())
    }
}
