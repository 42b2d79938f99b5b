use crate::connectors::LlmConnector;
use crate::models::Message;
use std::sync::Arc;

/// Texts this short are not worth summarizing.
const MIN_SUMMARY_INPUT_CHARS: usize = 5;

/// Optional document summarizer backed by a second generative text endpoint.
/// Never fails: any problem yields `None`.
#[derive(Clone, Default)]
pub struct Summarizer {
    connector: Option<Arc<dyn LlmConnector>>,
}

impl Summarizer {
    pub fn new(connector: Option<Arc<dyn LlmConnector>>) -> Self {
        Self { connector }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.connector.is_some()
    }

    pub fn prompt(text: &str) -> String {
        format!("Summarize this document clearly:\n\n{}", text)
    }

    #[tracing::instrument(name = "Summarize upload.", skip_all, fields(chars = text.len()))]
    pub async fn summarize(&self, text: &str) -> Option<String> {
        if text.trim().chars().count() <= MIN_SUMMARY_INPUT_CHARS {
            return None;
        }
        let connector = match &self.connector {
            Some(connector) => connector,
            None => {
                tracing::warn!("Summarizer is not configured");
                return None;
            }
        };

        match connector.generate(&[Message::user(Self::prompt(text))]).await {
            Ok(completion) => completion
                .text
                .map(|summary| summary.trim().to_string())
                .filter(|summary| !summary.is_empty()),
            Err(err) => {
                tracing::warn!("AI summary failed: {}", err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::llm::mock::MockLlmConnector;

    #[tokio::test]
    async fn short_text_is_not_sent() {
        let llm = Arc::new(MockLlmConnector::new("summary"));
        let summarizer = Summarizer::new(Some(llm.clone()));
        assert_eq!(summarizer.summarize("  hi  ").await, None);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn summary_is_trimmed() {
        let llm = Arc::new(MockLlmConnector::new("  a short summary \n"));
        let summarizer = Summarizer::new(Some(llm.clone()));
        assert_eq!(
            summarizer.summarize("a long enough document").await.as_deref(),
            Some("a short summary")
        );
        let request = llm.last_request();
        assert_eq!(request.len(), 1);
        assert!(request[0].content.starts_with("Summarize this document clearly:"));
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        let summarizer = Summarizer::new(Some(Arc::new(MockLlmConnector::failing("quota"))));
        assert_eq!(summarizer.summarize("a long enough document").await, None);
        assert_eq!(Summarizer::disabled().summarize("a long enough document").await, None);
    }
}
