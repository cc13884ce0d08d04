use serde::{Deserialize, Serialize};

fn enabled() -> bool {
    true
}

/// An inbound question with its enrichment flags.
///
/// Flags omitted from a JSON request default to on; `Query::new` starts
/// with both off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub message: String,
    #[serde(default = "enabled")]
    pub include_news: bool,
    #[serde(default = "enabled")]
    pub include_sentiment: bool,
}

impl Query {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            include_news: false,
            include_sentiment: false,
        }
    }

    pub fn with_news(mut self, include: bool) -> Self {
        self.include_news = include;
        self
    }

    pub fn with_sentiment(mut self, include: bool) -> Self {
        self.include_sentiment = include;
        self
    }

    /// Whether any enrichment source needs to be consulted.
    pub fn wants_enrichment(&self) -> bool {
        self.include_news || self.include_sentiment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_flags_default_on() {
        let query: Query = serde_json::from_str(r#"{"message":"Explain the levy"}"#).unwrap();
        assert!(query.include_news && query.include_sentiment);

        let query: Query =
            serde_json::from_str(r#"{"message":"m","include_news":false,"include_sentiment":false}"#)
                .unwrap();
        assert_eq!(query, Query::new("m"));
        assert!(!query.wants_enrichment());
    }

    #[test]
    fn test_sentiment_alone_wants_enrichment() {
        assert!(Query::new("q").with_sentiment(true).wants_enrichment());
    }
}
