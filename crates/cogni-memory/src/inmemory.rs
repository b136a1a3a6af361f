//! In-memory context store implementation

use crate::ContextStore;
use async_trait::async_trait;
use cogni_core::{
    ConversationContext, ConversationMessage, Error, LearningProgress, Result,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Mastery at or above this level marks a topic as a strength.
const STRENGTH_THRESHOLD: f32 = 0.75;

/// Mastery below this level marks a topic as needing improvement.
const IMPROVEMENT_THRESHOLD: f32 = 0.5;

/// In-memory implementation of the context store.
///
/// This is suitable for testing and local development. It reproduces the
/// backend's behavior of recomputing [`LearningProgress`] from the full
/// message history on every append, so the re-fetch-after-write pattern of
/// the memory manager is observable without a backend.
///
/// Thread-safe.
#[derive(Clone)]
pub struct InMemoryContextStore {
    contexts: Arc<RwLock<HashMap<String, ConversationContext>>>,
}

impl InMemoryContextStore {
    pub fn new() -> Self {
        Self {
            contexts: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryContextStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContextStore for InMemoryContextStore {
    async fn get(&self, session_id: &str) -> Result<Option<ConversationContext>> {
        let contexts = self.contexts.read().unwrap();
        Ok(contexts.get(session_id).cloned())
    }

    async fn put(&self, context: &ConversationContext) -> Result<()> {
        let mut contexts = self.contexts.write().unwrap();

        if let Some(existing) = contexts.get(&context.session_id) {
            if existing.version != context.version {
                return Err(Error::Conflict(format!(
                    "session {}: expected version {}, found {}",
                    context.session_id, context.version, existing.version
                )));
            }
        }

        let mut stored = context.clone();
        stored.version += 1;
        stored.dirty = false;
        contexts.insert(stored.session_id.clone(), stored);
        Ok(())
    }

    async fn append_message(
        &self,
        session_id: &str,
        tutor_id: &str,
        message: ConversationMessage,
    ) -> Result<()> {
        let mut contexts = self.contexts.write().unwrap();

        let context = contexts
            .entry(session_id.to_string())
            .or_insert_with(|| ConversationContext::new(session_id, tutor_id));

        context.push_message(message);
        context.progress = recompute_progress(&context.messages, &context.progress);
        context.version += 1;

        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        let mut contexts = self.contexts.write().unwrap();
        contexts.remove(session_id);
        Ok(())
    }
}

/// Recompute the derived progress aggregate from the full message history.
///
/// Mastery per topic is the running average of comprehension scores on
/// messages tagged with that topic. Topics without any scored message keep
/// their coverage but get no mastery entry.
fn recompute_progress(
    messages: &[ConversationMessage],
    previous: &LearningProgress,
) -> LearningProgress {
    let mut progress = LearningProgress {
        learning_style: previous.learning_style.clone(),
        ..LearningProgress::default()
    };

    let mut sums: HashMap<&str, (f32, u32)> = HashMap::new();

    for message in messages {
        let Some(topic) = &message.topic else {
            continue;
        };
        progress.record_topic(topic.clone());

        if let Some(score) = message.comprehension_score {
            let entry = sums.entry(topic.as_str()).or_insert((0.0, 0));
            entry.0 += score;
            entry.1 += 1;
        }
    }

    for (topic, (sum, count)) in sums {
        let average = sum / count as f32;
        progress.set_mastery(topic, average);

        if average >= STRENGTH_THRESHOLD {
            progress.strengths.insert(topic.to_string());
        } else if average < IMPROVEMENT_THRESHOLD {
            progress.areas_for_improvement.insert(topic.to_string());
        }
    }

    progress
}

#[cfg(test)]
mod tests {
    use super::*;
    use cogni_core::Role;

    fn message(content: &str, topic: Option<&str>, score: Option<f32>) -> ConversationMessage {
        let mut msg = ConversationMessage::new(Role::User, content);
        if let Some(topic) = topic {
            msg = msg.with_topic(topic);
        }
        if let Some(score) = score {
            msg = msg.with_comprehension_score(score);
        }
        msg
    }

    #[tokio::test]
    async fn test_append_creates_context() {
        let store = InMemoryContextStore::new();

        store
            .append_message("s1", "t1", message("hello", Some("CS"), None))
            .await
            .unwrap();

        let ctx = store.get("s1").await.unwrap().unwrap();
        assert_eq!(ctx.tutor_id, "t1");
        assert_eq!(ctx.messages.len(), 1);
        assert_eq!(ctx.current_topic.as_deref(), Some("CS"));
    }

    #[tokio::test]
    async fn test_progress_recomputed_on_append() {
        let store = InMemoryContextStore::new();

        store
            .append_message("s1", "t1", message("q1", Some("recursion"), Some(0.4)))
            .await
            .unwrap();
        store
            .append_message("s1", "t1", message("q2", Some("recursion"), Some(0.2)))
            .await
            .unwrap();
        store
            .append_message("s1", "t1", message("q3", Some("algebra"), Some(0.9)))
            .await
            .unwrap();

        let ctx = store.get("s1").await.unwrap().unwrap();
        let progress = &ctx.progress;

        assert!(progress.is_consistent());
        assert!((progress.mastery_of("recursion").unwrap() - 0.3).abs() < 1e-6);
        assert!(progress.areas_for_improvement.contains("recursion"));
        assert!(progress.strengths.contains("algebra"));
    }

    #[tokio::test]
    async fn test_put_rejects_stale_version() {
        let store = InMemoryContextStore::new();

        store
            .append_message("s1", "t1", message("hello", None, None))
            .await
            .unwrap();

        let stale = {
            let mut ctx = store.get("s1").await.unwrap().unwrap();
            ctx.version = 0; // pretend we loaded before the append
            ctx
        };

        let err = store.put(&stale).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_put_bumps_version() {
        let store = InMemoryContextStore::new();

        let ctx = ConversationContext::new("s1", "t1");
        store.put(&ctx).await.unwrap();

        let stored = store.get("s1").await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let store = InMemoryContextStore::new();
        store.delete("nope").await.unwrap();
    }
}
