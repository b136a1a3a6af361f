//! # Conversation Memory
//!
//! Per-session conversation state for AI tutoring: an ordered message history,
//! an inferred topic and difficulty, and derived learning-progress metrics.
//!
//! ## Overview
//!
//! The [`ConversationMemoryManager`] owns the single authoritative
//! [`ConversationContext`] for each active session and exposes read/derived
//! views to the UI and to prompt construction. Persistence sits behind the
//! [`ContextStore`] trait, with an in-memory implementation for tests and
//! local development and a REST implementation for the production backend.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cogni_memory::{AddMessageRequest, ConversationMemoryManager, InMemoryContextStore};
//! use cogni_core::Role;
//! use std::sync::Arc;
//!
//! # async fn example() -> cogni_core::Result<()> {
//! let manager = ConversationMemoryManager::new(Arc::new(InMemoryContextStore::new()));
//!
//! manager
//!     .add_message(AddMessageRequest {
//!         session_id: "s1".into(),
//!         tutor_id: "t1".into(),
//!         role: Role::User,
//!         content: "What is recursion?".into(),
//!         topic: Some("CS".into()),
//!         difficulty: None,
//!         comprehension_score: None,
//!     })
//!     .await?;
//!
//! let context = manager.load_context("s1").await?;
//! println!("summary: {}", cogni_memory::conversation_summary(&context));
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use cogni_core::{ConversationContext, ConversationMessage, Result};

mod inmemory;
mod manager;
mod rest;

pub use inmemory::InMemoryContextStore;
pub use manager::{
    conversation_summary, learning_suggestions, AddMessageRequest, ConversationMemoryManager,
};
pub use rest::RestContextStore;

/// Persistence collaborator for conversation contexts.
///
/// The store is the system of record; derived progress is recomputed by the
/// store on every append, which is why callers re-fetch after writing.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Fetch the persisted context for a session, `None` when absent.
    async fn get(&self, session_id: &str) -> Result<Option<ConversationContext>>;

    /// Persist a full context snapshot.
    ///
    /// Fails with `Error::Conflict` when the stored version differs from the
    /// snapshot's version (stale write). On success the stored version is
    /// bumped by one.
    async fn put(&self, context: &ConversationContext) -> Result<()>;

    /// Append one immutable message, creating the context on first use.
    /// Derived progress, topic and difficulty are recomputed by the store.
    async fn append_message(
        &self,
        session_id: &str,
        tutor_id: &str,
        message: ConversationMessage,
    ) -> Result<()>;

    /// Delete persisted context. Deleting a non-existing entry is not an error.
    async fn delete(&self, session_id: &str) -> Result<()>;
}
