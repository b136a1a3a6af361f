//! Core types for the CogniEdufy client
//!
//! This crate provides the shared data model, error taxonomy and configuration
//! used by the conversation memory and knowledge retrieval crates.

pub mod capabilities;
pub mod chunk;
pub mod config;
pub mod context;
pub mod error;
pub mod message;
pub mod progress;
pub mod telemetry;

// Re-exports
pub use capabilities::{StoreCapability, StoreMetadata};
pub use chunk::{ChunkMetadata, DocumentChunk, DocumentStats, RagSearchResult};
pub use config::{CogniConfig, KnowledgeConfig, MemoryConfig};
pub use context::ConversationContext;
pub use error::{Error, Result};
pub use message::{ConversationMessage, Difficulty, Role};
pub use progress::LearningProgress;
