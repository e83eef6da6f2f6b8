//! Model invoker: one retrieve-and-generate call per user message.
//!
//! Only the new message is sent; earlier turns are never forwarded, so every
//! answer is grounded in the knowledge base alone.

use crate::config::KnowledgeBaseTarget;
use crate::error::{ChatbotError, ChatbotResult};
use crate::remote::KnowledgeBaseRuntime;

use super::history::Conversation;
use super::message::ChatMessage;

/// Sends user messages to the hosted knowledge-base model.
pub struct ModelInvoker<'a> {
    runtime: &'a dyn KnowledgeBaseRuntime,
    knowledge_base_id: &'a str,
    model_arn: &'a str,
}

impl<'a> ModelInvoker<'a> {
    /// Bind a runtime to the configured knowledge base and model.
    #[must_use]
    pub fn new(runtime: &'a dyn KnowledgeBaseRuntime, target: &'a KnowledgeBaseTarget) -> Self {
        Self {
            runtime,
            knowledge_base_id: &target.knowledge_base_id,
            model_arn: &target.model_arn,
        }
    }

    /// Generate the assistant reply to `text`.
    ///
    /// A retrieve-only query follows for diagnostics; its passages are logged
    /// and dropped, and its failure never fails the reply.
    ///
    /// # Errors
    /// Returns the remote error of the generation call.
    pub async fn generate(&self, text: &str) -> ChatbotResult<String> {
        let generated = self
            .runtime
            .retrieve_and_generate(text, self.knowledge_base_id, self.model_arn)
            .await?;

        match self.runtime.retrieve(text, self.knowledge_base_id).await {
            Ok(passages) => {
                tracing::debug!(count = passages.len(), "retrieved passages");
                for passage in &passages {
                    tracing::debug!(
                        score = ?passage.score,
                        source = passage.source.as_deref().unwrap_or("-"),
                        "{}",
                        passage.text
                    );
                }
            }
            Err(e) => tracing::warn!("diagnostic retrieval failed: {e}"),
        }

        Ok(generated)
    }

    /// Answer `text` and return `history` with the new exchange appended and
    /// the oldest exchanges evicted past the cap.
    ///
    /// `history` itself is untouched, so a failure leaves the caller's
    /// conversation as it was.
    ///
    /// # Errors
    /// Returns `InvalidInput` for a blank message, or the generation error.
    pub async fn respond(&self, history: &Conversation, text: &str) -> ChatbotResult<Conversation> {
        if text.trim().is_empty() {
            return Err(ChatbotError::InvalidInput("message is empty".to_string()));
        }

        let user = ChatMessage::user(text);
        let reply = self.generate(text).await?;

        Ok(history
            .clone()
            .with_exchange(user, ChatMessage::assistant(reply)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::remote::fake::FakeKnowledgeBase;

    fn target() -> KnowledgeBaseTarget {
        KnowledgeBaseTarget {
            bucket: "kb-docs".to_string(),
            knowledge_base_id: "KB123".to_string(),
            data_source_id: "DS456".to_string(),
            model_arn: "arn:aws:bedrock:us-east-1::foundation-model/m".to_string(),
        }
    }

    #[tokio::test]
    async fn test_respond_appends_exchange() {
        let runtime = FakeKnowledgeBase::default();
        let target = target();
        let invoker = ModelInvoker::new(&runtime, &target);

        let history = invoker
            .respond(&Conversation::new(10), "what is the refund policy?")
            .await;

        assert!(history.is_ok());
        let Ok(history) = history else { return };
        assert_eq!(history.len(), 2);
        assert_eq!(
            history.messages()[1].text(),
            "answer to: what is the refund policy?"
        );
        assert_eq!(runtime.retrieves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_only_new_message_is_sent() {
        let runtime = FakeKnowledgeBase::default();
        let target = target();
        let invoker = ModelInvoker::new(&runtime, &target);

        let mut history = Conversation::new(10);
        for text in ["first", "second"] {
            let next = invoker.respond(&history, text).await;
            assert!(next.is_ok());
            if let Ok(next) = next {
                history = next;
            }
        }

        let sent = runtime.generated.lock().map(|g| g.clone()).unwrap_or_default();
        assert_eq!(sent, vec!["first".to_string(), "second".to_string()]);
    }

    #[tokio::test]
    async fn test_generation_failure_leaves_history() {
        let runtime = FakeKnowledgeBase {
            fail_generate: true,
            ..FakeKnowledgeBase::default()
        };
        let target = target();
        let invoker = ModelInvoker::new(&runtime, &target);
        let history = Conversation::new(10);

        let result = invoker.respond(&history, "hello").await;

        assert!(result.is_err());
        assert!(history.is_empty());
        assert_eq!(runtime.retrieves.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_diagnostic_failure_is_ignored() {
        let runtime = FakeKnowledgeBase {
            fail_retrieve: true,
            ..FakeKnowledgeBase::default()
        };
        let target = target();
        let invoker = ModelInvoker::new(&runtime, &target);

        let reply = invoker.generate("hello").await;

        assert_eq!(reply.ok().as_deref(), Some("answer to: hello"));
    }

    #[tokio::test]
    async fn test_blank_message_rejected() {
        let runtime = FakeKnowledgeBase::default();
        let target = target();
        let invoker = ModelInvoker::new(&runtime, &target);

        let result = invoker.respond(&Conversation::new(10), "   ").await;

        assert!(matches!(result, Err(ChatbotError::InvalidInput(_))));
        assert!(runtime.generated.lock().map(|g| g.is_empty()).unwrap_or(false));
    }
}
