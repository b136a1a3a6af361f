use crate::{ConversationMessage, Difficulty, LearningProgress};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// ConversationContext is the sole mutable aggregate for one (session, tutor)
/// pair: an ordered message history plus the derived learning progress.
///
/// The `version` counter implements optimistic concurrency: stores reject a
/// `put` whose version does not match the stored one, and bump the counter on
/// every accepted write.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationContext {
    pub session_id: String,
    pub tutor_id: String,
    pub messages: Vec<ConversationMessage>,
    pub progress: LearningProgress,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_topic: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty_level: Option<Difficulty>,

    pub last_updated: DateTime<Utc>,

    #[serde(default)]
    pub version: u64,

    /// Set when an optimistic in-memory update failed to persist. Client-local,
    /// never serialized.
    #[serde(skip)]
    pub dirty: bool,
}

impl ConversationContext {
    pub fn new(session_id: impl Into<String>, tutor_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            tutor_id: tutor_id.into(),
            messages: Vec::new(),
            progress: LearningProgress::default(),
            current_topic: None,
            difficulty_level: None,
            last_updated: Utc::now(),
            version: 0,
            dirty: false,
        }
    }

    /// Append a message, updating the session topic and difficulty when the
    /// message carries them. Messages are immutable once appended.
    pub fn push_message(&mut self, message: ConversationMessage) {
        if let Some(topic) = &message.topic {
            self.current_topic = Some(topic.clone());
            self.progress.record_topic(topic.clone());
        }
        if let Some(difficulty) = message.difficulty {
            self.difficulty_level = Some(difficulty);
        }
        self.messages.push(message);
        self.touch();
    }

    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }
}
