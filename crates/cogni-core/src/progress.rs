use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// LearningProgress is the mutable aggregate derived from a session's messages.
///
/// Ordered collections are used so that derived views (summaries, suggestions)
/// are deterministic for a given context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningProgress {
    pub topics_covered: BTreeSet<String>,

    /// Topic -> inferred mastery in [0, 1]. Every key also appears in
    /// `topics_covered`.
    pub mastery_level: BTreeMap<String, f32>,

    pub strengths: BTreeSet<String>,
    pub areas_for_improvement: BTreeSet<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_style: Option<String>,
}

impl LearningProgress {
    pub fn record_topic(&mut self, topic: impl Into<String>) {
        self.topics_covered.insert(topic.into());
    }

    /// Set the mastery level for a topic, clamped to [0, 1].
    ///
    /// Also records the topic as covered so the derived fields stay
    /// consistent with each other.
    pub fn set_mastery(&mut self, topic: impl Into<String>, level: f32) {
        let topic = topic.into();
        self.topics_covered.insert(topic.clone());
        self.mastery_level.insert(topic, level.clamp(0.0, 1.0));
    }

    pub fn mastery_of(&self, topic: &str) -> Option<f32> {
        self.mastery_level.get(topic).copied()
    }

    /// Check the internal invariant: mastery keys are a subset of covered topics.
    pub fn is_consistent(&self) -> bool {
        self.mastery_level
            .keys()
            .all(|topic| self.topics_covered.contains(topic))
    }
}
