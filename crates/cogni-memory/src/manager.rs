//! Conversation memory manager

use crate::ContextStore;
use cogni_core::{
    ConversationContext, ConversationMessage, Difficulty, Error, LearningProgress, MemoryConfig,
    Result, Role,
};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tokio::sync::Mutex;

/// Request to append one dialogue turn to a session.
#[derive(Debug, Clone)]
pub struct AddMessageRequest {
    pub session_id: String,
    pub tutor_id: String,
    pub role: Role,
    pub content: String,
    pub topic: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub comprehension_score: Option<f32>,
}

/// Maintains the authoritative [`ConversationContext`] per active session.
///
/// All persistence goes through the injected [`ContextStore`]; the manager
/// keeps a local cache of loaded contexts and serializes loads and appends
/// per session so concurrent callers cannot interleave stale views.
pub struct ConversationMemoryManager {
    store: Arc<dyn ContextStore>,
    contexts: RwLock<HashMap<String, ConversationContext>>,
    session_guards: DashMap<String, Arc<Mutex<()>>>,
    last_loaded: DashMap<String, Instant>,
    mastery_threshold: f32,
    max_suggestions: usize,
}

impl ConversationMemoryManager {
    pub fn new(store: Arc<dyn ContextStore>) -> Self {
        Self::with_config(store, &MemoryConfig::default())
    }

    pub fn with_config(store: Arc<dyn ContextStore>, config: &MemoryConfig) -> Self {
        Self {
            store,
            contexts: RwLock::new(HashMap::new()),
            session_guards: DashMap::new(),
            last_loaded: DashMap::new(),
            mastery_threshold: config.mastery_threshold,
            max_suggestions: config.max_suggestions,
        }
    }

    /// Load the persisted context for a session into the local cache.
    ///
    /// Loads for one session are serialized; a load that completed while this
    /// caller was waiting on the guard satisfies the call without a second
    /// fetch. On failure the previously cached context is left untouched.
    pub async fn load_context(&self, session_id: &str) -> Result<ConversationContext> {
        let requested_at = Instant::now();
        let guard = self.session_guard(session_id);
        let _held = guard.lock().await;

        if let Some(loaded_at) = self.last_loaded.get(session_id) {
            if *loaded_at >= requested_at {
                if let Some(context) = self.cached(session_id) {
                    tracing::debug!(session_id, "load coalesced with in-flight fetch");
                    return Ok(context);
                }
            }
        }

        let context = self
            .store
            .get(session_id)
            .await?
            .ok_or_else(|| Error::ContextNotFound(session_id.to_string()))?;

        self.cache(context.clone());
        self.last_loaded
            .insert(session_id.to_string(), Instant::now());

        Ok(context)
    }

    /// Append a message and re-fetch the full context.
    ///
    /// The store recomputes derived progress on append, so re-fetching (rather
    /// than patching locally) keeps the cache consistent with the system of
    /// record. Appends for one session are serialized through the session
    /// guard; the append is not retried on failure.
    pub async fn add_message(&self, req: AddMessageRequest) -> Result<()> {
        let guard = self.session_guard(&req.session_id);
        let _held = guard.lock().await;

        let mut message = ConversationMessage::new(req.role, req.content);
        if let Some(topic) = req.topic {
            message = message.with_topic(topic);
        }
        if let Some(difficulty) = req.difficulty {
            message = message.with_difficulty(difficulty);
        }
        if let Some(score) = req.comprehension_score {
            message = message.with_comprehension_score(score);
        }

        self.store
            .append_message(&req.session_id, &req.tutor_id, message)
            .await?;

        let refreshed = self
            .store
            .get(&req.session_id)
            .await?
            .ok_or_else(|| Error::AddMessage("context missing after append".to_string()))?;

        self.cache(refreshed);
        self.last_loaded
            .insert(req.session_id.clone(), Instant::now());

        Ok(())
    }

    /// Update the session topic. No-op when no context is loaded.
    ///
    /// The in-memory update is optimistic: on persistence failure the new
    /// value is retained and the context is marked dirty so the UI can
    /// surface the unsynced state.
    pub async fn update_topic(&self, session_id: &str, topic: impl Into<String>) -> Result<()> {
        let topic = topic.into();
        self.optimistic_update(session_id, move |context| {
            context.current_topic = Some(topic.clone());
            context.progress.record_topic(topic.clone());
        })
        .await
    }

    /// Update the session difficulty. Same semantics as [`update_topic`].
    ///
    /// [`update_topic`]: ConversationMemoryManager::update_topic
    pub async fn update_difficulty(
        &self,
        session_id: &str,
        difficulty: Difficulty,
    ) -> Result<()> {
        self.optimistic_update(session_id, move |context| {
            context.difficulty_level = Some(difficulty);
        })
        .await
    }

    /// Delete the persisted context and drop the cached one.
    ///
    /// The in-memory context is cleared even when remote deletion fails; the
    /// failure is still reported to the caller.
    pub async fn clear_memory(&self, session_id: &str) -> Result<()> {
        let guard = self.session_guard(session_id);
        let _held = guard.lock().await;

        let result = self.store.delete(session_id).await;

        self.contexts.write().unwrap().remove(session_id);
        self.last_loaded.remove(session_id);
        // Two strong counts here: the map entry and this call's clone. More
        // means another caller is waiting on the guard, so it stays.
        self.session_guards
            .remove_if(session_id, |_, entry| Arc::strong_count(entry) <= 2);

        if let Err(ref err) = result {
            tracing::warn!(session_id, %err, "remote deletion failed, local memory cleared anyway");
        }
        result
    }

    /// Snapshot of the cached context for a session, if loaded.
    pub fn context(&self, session_id: &str) -> Option<ConversationContext> {
        self.cached(session_id)
    }

    /// Human-readable synopsis of the cached or given context.
    pub fn summary(&self, context: &ConversationContext) -> String {
        conversation_summary(context)
    }

    /// Learning suggestions for the given context, weakest topics first.
    pub fn suggestions(&self, context: &ConversationContext) -> Vec<String> {
        learning_suggestions(context, self.mastery_threshold, self.max_suggestions)
    }

    async fn optimistic_update<F>(&self, session_id: &str, apply: F) -> Result<()>
    where
        F: FnOnce(&mut ConversationContext),
    {
        let guard = self.session_guard(session_id);
        let _held = guard.lock().await;

        let snapshot = {
            let mut contexts = self.contexts.write().unwrap();
            let Some(context) = contexts.get_mut(session_id) else {
                tracing::debug!(session_id, "no context loaded, skipping update");
                return Ok(());
            };
            apply(context);
            context.touch();
            context.clone()
        };

        match self.store.put(&snapshot).await {
            Ok(()) => {
                let mut contexts = self.contexts.write().unwrap();
                if let Some(context) = contexts.get_mut(session_id) {
                    context.version += 1;
                    context.dirty = false;
                }
                Ok(())
            }
            Err(err) => {
                let mut contexts = self.contexts.write().unwrap();
                if let Some(context) = contexts.get_mut(session_id) {
                    context.dirty = true;
                }
                Err(err)
            }
        }
    }

    fn session_guard(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.session_guards
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn cached(&self, session_id: &str) -> Option<ConversationContext> {
        self.contexts.read().unwrap().get(session_id).cloned()
    }

    fn cache(&self, context: ConversationContext) {
        self.contexts
            .write()
            .unwrap()
            .insert(context.session_id.clone(), context);
    }
}

/// Produce a deterministic human-readable synopsis of a context.
pub fn conversation_summary(context: &ConversationContext) -> String {
    let mut summary = match (&context.current_topic, context.difficulty_level) {
        (Some(topic), Some(difficulty)) => {
            format!("Currently studying {} at {} level.", topic, difficulty.as_str())
        }
        (Some(topic), None) => format!("Currently studying {}.", topic),
        (None, _) => "No active topic yet.".to_string(),
    };

    let mut entries: Vec<(&String, f32)> = context
        .progress
        .mastery_level
        .iter()
        .map(|(topic, level)| (topic, *level))
        .collect();
    entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    if !entries.is_empty() {
        let top = entries
            .iter()
            .take(3)
            .map(|(topic, level)| format!("{} ({:.0}%)", topic, level * 100.0))
            .collect::<Vec<_>>()
            .join(", ");
        summary.push_str(&format!(" Strongest topics: {}.", top));
    }

    summary.push_str(&format!(" {} messages exchanged.", context.messages.len()));
    summary
}

/// Derive learning suggestions, ordered ascending by mastery and capped.
///
/// Every suggested topic comes from `areas_for_improvement` or has mastery
/// below `threshold`; topics without a mastery entry count as 0.
pub fn learning_suggestions(
    context: &ConversationContext,
    threshold: f32,
    cap: usize,
) -> Vec<String> {
    suggestion_candidates(&context.progress, threshold)
        .into_iter()
        .take(cap)
        .map(|(topic, mastery)| {
            format!(
                "Revisit {} to strengthen your understanding (mastery {:.0}%)",
                topic,
                mastery * 100.0
            )
        })
        .collect()
}

/// Candidate topics for suggestions with their mastery, weakest first.
pub(crate) fn suggestion_candidates(
    progress: &LearningProgress,
    threshold: f32,
) -> Vec<(String, f32)> {
    let mut candidates: Vec<(String, f32)> = Vec::new();

    for topic in &progress.areas_for_improvement {
        let mastery = progress.mastery_of(topic).unwrap_or(0.0);
        candidates.push((topic.clone(), mastery));
    }

    for (topic, level) in &progress.mastery_level {
        if *level < threshold && !progress.areas_for_improvement.contains(topic) {
            candidates.push((topic.clone(), *level));
        }
    }

    candidates.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryContextStore;
    use async_trait::async_trait;
    use cogni_core::ConversationMessage;

    mockall::mock! {
        pub Store {}

        #[async_trait]
        impl ContextStore for Store {
            async fn get(&self, session_id: &str) -> Result<Option<ConversationContext>>;
            async fn put(&self, context: &ConversationContext) -> Result<()>;
            async fn append_message(
                &self,
                session_id: &str,
                tutor_id: &str,
                message: ConversationMessage,
            ) -> Result<()>;
            async fn delete(&self, session_id: &str) -> Result<()>;
        }
    }

    fn manager() -> ConversationMemoryManager {
        ConversationMemoryManager::new(Arc::new(InMemoryContextStore::new()))
    }

    fn add_request(session_id: &str, content: &str, topic: Option<&str>) -> AddMessageRequest {
        AddMessageRequest {
            session_id: session_id.to_string(),
            tutor_id: "t1".to_string(),
            role: Role::User,
            content: content.to_string(),
            topic: topic.map(str::to_string),
            difficulty: None,
            comprehension_score: None,
        }
    }

    #[tokio::test]
    async fn test_add_message_then_load() {
        let manager = manager();

        manager
            .add_message(add_request("s1", "What is recursion?", Some("CS")))
            .await
            .unwrap();

        let context = manager.load_context("s1").await.unwrap();
        assert_eq!(context.messages.len(), 1);
        assert_eq!(context.messages[0].content, "What is recursion?");
        assert_eq!(context.current_topic.as_deref(), Some("CS"));
    }

    #[tokio::test]
    async fn test_appends_preserve_call_order() {
        let manager = manager();

        for i in 0..10 {
            manager
                .add_message(add_request("s1", &format!("msg {i}"), None))
                .await
                .unwrap();
        }

        let context = manager.load_context("s1").await.unwrap();
        let contents: Vec<_> = context.messages.iter().map(|m| m.content.clone()).collect();
        let expected: Vec<_> = (0..10).map(|i| format!("msg {i}")).collect();
        assert_eq!(contents, expected);
    }

    #[tokio::test]
    async fn test_concurrent_appends_keep_both_messages() {
        let manager = Arc::new(manager());

        let a = {
            let manager = manager.clone();
            tokio::spawn(async move {
                manager
                    .add_message(add_request("s1", "from caller a", None))
                    .await
            })
        };
        let b = {
            let manager = manager.clone();
            tokio::spawn(async move {
                manager
                    .add_message(add_request("s1", "from caller b", None))
                    .await
            })
        };

        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let context = manager.load_context("s1").await.unwrap();
        assert_eq!(context.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_load_missing_context() {
        let manager = manager();
        let err = manager.load_context("absent").await.unwrap_err();
        assert!(matches!(err, Error::ContextNotFound(_)));
    }

    #[tokio::test]
    async fn test_load_failure_leaves_cache_untouched() {
        let mut store = MockStore::new();
        store
            .expect_append_message()
            .returning(|_, _, _| Ok(()));
        store
            .expect_get()
            .times(1)
            .returning(|_| {
                Ok(Some(ConversationContext::new("s1", "t1")))
            });
        store
            .expect_get()
            .returning(|_| Err(Error::Load("backend unreachable".to_string())));

        let manager = ConversationMemoryManager::new(Arc::new(store));

        manager
            .add_message(add_request("s1", "hello", None))
            .await
            .unwrap();
        assert!(manager.context("s1").is_some());

        let err = manager.load_context("s1").await.unwrap_err();
        assert!(matches!(err, Error::Load(_)));
        assert!(manager.context("s1").is_some());
    }

    #[tokio::test]
    async fn test_update_topic_without_context_is_noop() {
        let mut store = MockStore::new();
        store.expect_put().never();

        let manager = ConversationMemoryManager::new(Arc::new(store));
        manager.update_topic("s1", "CS").await.unwrap();
    }

    #[tokio::test]
    async fn test_update_topic_marks_dirty_on_persist_failure() {
        let mut store = MockStore::new();
        store
            .expect_get()
            .returning(|_| Ok(Some(ConversationContext::new("s1", "t1"))));
        store
            .expect_put()
            .returning(|_| Err(Error::Other(anyhow::anyhow!("backend down"))));

        let manager = ConversationMemoryManager::new(Arc::new(store));
        manager.load_context("s1").await.unwrap();

        let err = manager.update_topic("s1", "CS").await;
        assert!(err.is_err());

        let context = manager.context("s1").unwrap();
        assert_eq!(context.current_topic.as_deref(), Some("CS"));
        assert!(context.dirty);
    }

    #[tokio::test]
    async fn test_update_topic_persists_and_bumps_version() {
        let manager = manager();

        manager
            .add_message(add_request("s1", "hello", None))
            .await
            .unwrap();
        let before = manager.context("s1").unwrap().version;

        manager.update_topic("s1", "CS").await.unwrap();

        let context = manager.context("s1").unwrap();
        assert_eq!(context.current_topic.as_deref(), Some("CS"));
        assert_eq!(context.version, before + 1);
        assert!(!context.dirty);
    }

    #[tokio::test]
    async fn test_clear_memory_clears_even_on_remote_failure() {
        let mut store = MockStore::new();
        store
            .expect_get()
            .returning(|_| Ok(Some(ConversationContext::new("s1", "t1"))));
        store
            .expect_delete()
            .returning(|_| Err(Error::Other(anyhow::anyhow!("delete failed"))));

        let manager = ConversationMemoryManager::new(Arc::new(store));
        manager.load_context("s1").await.unwrap();

        let result = manager.clear_memory("s1").await;
        assert!(result.is_err());
        assert!(manager.context("s1").is_none());
    }

    #[tokio::test]
    async fn test_clear_memory_releases_session_guard() {
        let manager = manager();

        manager
            .add_message(add_request("s1", "hello", None))
            .await
            .unwrap();
        assert!(manager.session_guards.contains_key("s1"));

        manager.clear_memory("s1").await.unwrap();
        assert!(!manager.session_guards.contains_key("s1"));
        assert!(manager.last_loaded.get("s1").is_none());

        // A fresh session after clearing gets a new guard and works as usual.
        manager
            .add_message(add_request("s1", "hello again", None))
            .await
            .unwrap();
        let context = manager.load_context("s1").await.unwrap();
        assert_eq!(context.messages.len(), 1);
    }

    #[test]
    fn test_summary_deterministic() {
        let mut context = ConversationContext::new("s1", "t1");
        context.current_topic = Some("recursion".to_string());
        context.difficulty_level = Some(Difficulty::Intermediate);
        context.progress.set_mastery("recursion", 0.8);
        context.progress.set_mastery("algebra", 0.8);

        let first = conversation_summary(&context);
        let second = conversation_summary(&context);
        assert_eq!(first, second);
        assert!(first.contains("recursion at intermediate level"));
        // Equal mastery breaks ties lexicographically.
        assert!(first.find("algebra").unwrap() < first.find("recursion (80%)").unwrap());
    }

    #[test]
    fn test_suggestions_sorted_and_bounded() {
        let mut progress = LearningProgress::default();
        progress.set_mastery("a", 0.9);
        progress.set_mastery("b", 0.3);
        progress.set_mastery("c", 0.1);
        progress.areas_for_improvement.insert("d".to_string());

        let candidates = suggestion_candidates(&progress, 0.6);
        let topics: Vec<_> = candidates.iter().map(|(t, _)| t.clone()).collect();

        // "d" has no mastery entry, so counts as 0 and comes first.
        assert_eq!(topics, vec!["d", "c", "b"]);
        for (topic, _) in &candidates {
            assert!(
                progress.areas_for_improvement.contains(topic)
                    || progress.mastery_of(topic).unwrap_or(0.0) < 0.6
            );
        }

        let mut context = ConversationContext::new("s1", "t1");
        context.progress = progress;
        let suggestions = learning_suggestions(&context, 0.6, 2);
        assert_eq!(suggestions.len(), 2);
        assert!(suggestions[0].contains("d"));
    }
}
