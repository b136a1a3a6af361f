//! Configuration management
//!
//! Loads configuration with priority:
//! 1. cogni.toml (or specified config file)
//! 2. Environment variables (fallback)
//! 3. Defaults

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CogniConfig {
    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub knowledge: KnowledgeConfig,
}

/// Conversation persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Base URL of the conversation persistence backend
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token (can reference env var with ${VAR_NAME})
    pub api_token: Option<String>,

    /// Mastery below this threshold marks a topic as needing review
    #[serde(default = "default_mastery_threshold")]
    pub mastery_threshold: f32,

    /// Cap on the number of learning suggestions returned
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
}

/// Remote knowledge store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Base URL of the knowledge store backend
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token (can reference env var with ${VAR_NAME})
    pub api_token: Option<String>,

    /// Target chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Default number of chunks requested per search
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_token: None,
            mastery_threshold: default_mastery_threshold(),
            max_suggestions: default_max_suggestions(),
        }
    }
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_token: None,
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            search_limit: default_search_limit(),
        }
    }
}

impl CogniConfig {
    /// Load configuration with the following priority:
    /// 1. Specified config file (if provided)
    /// 2. cogni.toml in current directory or parents
    /// 3. Environment variables (fallback)
    /// 4. Defaults
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p.to_path_buf()
        } else {
            Self::find_config_file()?
        };

        tracing::debug!("Loading configuration from: {:?}", config_path);

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let mut config: CogniConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        config.resolve_env_vars();

        Ok(config)
    }

    /// Find cogni.toml by searching current directory and parents
    fn find_config_file() -> Result<PathBuf> {
        let mut current = env::current_dir()?;

        loop {
            let config_path = current.join("cogni.toml");
            if config_path.exists() {
                return Ok(config_path);
            }

            if !current.pop() {
                break;
            }
        }

        Err(anyhow!(
            "cogni.toml not found. Create one with: cp cogni.toml.example cogni.toml"
        ))
    }

    /// Resolve ${VAR_NAME} references to environment variables
    fn resolve_env_vars(&mut self) {
        if let Some(ref token) = self.memory.api_token {
            self.memory.api_token = resolve_env_var(token);
        } else {
            self.memory.api_token = env::var("COGNI_API_TOKEN").ok();
        }

        if let Some(ref token) = self.knowledge.api_token {
            self.knowledge.api_token = resolve_env_var(token);
        } else {
            self.knowledge.api_token = env::var("COGNI_API_TOKEN").ok();
        }
    }

    /// Create test-friendly defaults (no backend required)
    pub fn test_defaults() -> Self {
        Self {
            memory: MemoryConfig {
                base_url: "http://localhost:8080".to_string(),
                api_token: Some("test-token".to_string()),
                ..MemoryConfig::default()
            },
            knowledge: KnowledgeConfig {
                base_url: "http://localhost:8080".to_string(),
                api_token: Some("test-token".to_string()),
                ..KnowledgeConfig::default()
            },
        }
    }
}

impl Default for CogniConfig {
    fn default() -> Self {
        Self {
            memory: MemoryConfig::default(),
            knowledge: KnowledgeConfig::default(),
        }
    }
}

/// Resolve a single ${VAR_NAME} reference
fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        env::var(var_name).ok()
    } else {
        Some(value.to_string())
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_mastery_threshold() -> f32 {
    0.6
}

fn default_max_suggestions() -> usize {
    5
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_search_limit() -> usize {
    5
}
