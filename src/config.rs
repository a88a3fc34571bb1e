use crate::app_dirs::AppDirs;
use crate::watcher::{self, Subscription};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const CONFIG_FILE: &str = "config.json";
const HIGH_SCORE_FILE: &str = "highscore.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// milliseconds the answer stays visible
    pub time_to_memorize: u64,
    /// seconds allowed for input; zero or negative disables the countdown
    pub timeout: i64,
    pub length: usize,
    pub allow_non_binary_digits: bool,
    pub use_custom_chars: bool,
    pub custom_chars: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_to_memorize: 1000,
            timeout: 30,
            length: 8,
            allow_non_binary_digits: false,
            use_custom_chars: false,
            custom_chars: "0123456789".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A save produced a document that fails schema validation. The
    /// persisted document is left untouched.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// Storage write failure. The in-memory state stays authoritative
    /// until the write can be retried.
    #[error("could not write {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FieldKind {
    Integer,
    Boolean,
    Text,
}

const SCHEMA: [(&str, FieldKind); 6] = [
    ("timeToMemorize", FieldKind::Integer),
    ("timeout", FieldKind::Integer),
    ("length", FieldKind::Integer),
    ("allowNonBinaryDigits", FieldKind::Boolean),
    ("useCustomChars", FieldKind::Boolean),
    ("customChars", FieldKind::Text),
];

/// Checks a configuration document against the schema: every required
/// field present with the declared JSON type, and the durations that
/// bound a round positive. Unknown fields are allowed.
pub fn validate_document(doc: &Value) -> Result<(), String> {
    let map = match doc.as_object() {
        Some(map) => map,
        None => return Err("document is not a JSON object".to_string()),
    };

    let missing = SCHEMA
        .iter()
        .filter(|(name, _)| !map.contains_key(*name))
        .map(|(name, _)| *name)
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(format!(
            "missing required fields: {}",
            missing.iter().join(", ")
        ));
    }

    for (name, kind) in &SCHEMA {
        let value = &map[*name];
        let matches = match kind {
            FieldKind::Integer => value.as_i64().is_some(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::Text => value.is_string(),
        };
        if !matches {
            return Err(format!("field {name} has the wrong type"));
        }
    }

    if map["timeToMemorize"].as_i64().unwrap_or(0) <= 0 {
        return Err("timeToMemorize must be a positive number of milliseconds".to_string());
    }
    if map["length"].as_i64().unwrap_or(0) <= 0 {
        return Err("length must be a positive number of characters".to_string());
    }

    Ok(())
}

/// Persistence for both durable documents: the configuration and the
/// high score. Corrupt or missing documents never surface as errors;
/// the configuration self-heals to defaults and the high score reads
/// as zero.
pub trait ConfigStore {
    fn load(&self) -> Result<Config, ConfigError>;
    fn save(&self, partial: &Value) -> Result<Config, ConfigError>;
    fn reset_to_default(&self) -> Result<Config, ConfigError>;
    fn high_score(&self) -> u64;
    fn set_high_score(&self, value: u64) -> Result<(), ConfigError>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    config_path: PathBuf,
    high_score_path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let dir = AppDirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::in_dir(dir)
    }

    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            config_path: dir.join(CONFIG_FILE),
            high_score_path: dir.join(HIGH_SCORE_FILE),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn high_score_path(&self) -> &Path {
        &self.high_score_path
    }

    /// Invokes `on_change` whenever the configuration document changes on
    /// storage, including edits made outside the application. Delivery is
    /// at-least-once; rapid successive edits may coalesce.
    pub fn subscribe<F>(&self, poll_interval: Duration, on_change: F) -> Subscription
    where
        F: Fn() + Send + 'static,
    {
        watcher::watch(self.config_path.clone(), poll_interval, on_change)
    }

    fn read_document(&self, path: &Path) -> Option<Value> {
        let bytes = fs::read(path).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// The persisted document with any unknown fields intact, or the
    /// default document when the file is absent or fails validation.
    fn current_document(&self) -> Value {
        match self.read_document(&self.config_path) {
            Some(doc) if validate_document(&doc).is_ok() => doc,
            _ => default_document(),
        }
    }

    fn write_document(&self, path: &Path, doc: &Value) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Persistence {
                path: path.to_path_buf(),
                source,
            })?;
        }
        let mut data = serde_json::to_vec_pretty(doc).unwrap_or_default();
        data.push(b'\n');
        fs::write(path, data).map_err(|source| ConfigError::Persistence {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn default_document() -> Value {
    serde_json::to_value(Config::default()).unwrap_or_default()
}

impl ConfigStore for FileConfigStore {
    /// Reads the configuration document. An absent, unreadable, or
    /// schema-failing document is rewritten with defaults and the
    /// defaults returned; only the repair write itself can fail.
    fn load(&self) -> Result<Config, ConfigError> {
        if let Some(doc) = self.read_document(&self.config_path) {
            match validate_document(&doc) {
                Ok(()) => {
                    if let Ok(config) = serde_json::from_value(doc) {
                        return Ok(config);
                    }
                }
                Err(reason) => {
                    log::warn!(
                        "configuration at {} failed validation ({reason}), rewriting defaults",
                        self.config_path.display()
                    );
                }
            }
        } else {
            log::warn!(
                "configuration at {} is missing or unreadable, writing defaults",
                self.config_path.display()
            );
        }

        self.write_document(&self.config_path, &default_document())?;
        Ok(Config::default())
    }

    /// Merges `partial` over the currently persisted document, preserving
    /// fields it does not mention (unknown fields included), validates the
    /// result, and writes it. A merge failing validation leaves the
    /// on-disk document untouched.
    fn save(&self, partial: &Value) -> Result<Config, ConfigError> {
        let overlay = partial.as_object().ok_or_else(|| {
            ConfigError::InvalidConfiguration("partial update is not a JSON object".to_string())
        })?;

        let mut doc = self.current_document();
        if let Some(map) = doc.as_object_mut() {
            for (key, value) in overlay {
                map.insert(key.clone(), value.clone());
            }
        }

        validate_document(&doc).map_err(ConfigError::InvalidConfiguration)?;
        let merged = serde_json::from_value(doc.clone())
            .map_err(|err| ConfigError::InvalidConfiguration(err.to_string()))?;
        self.write_document(&self.config_path, &doc)?;
        Ok(merged)
    }

    fn reset_to_default(&self) -> Result<Config, ConfigError> {
        self.write_document(&self.config_path, &default_document())?;
        Ok(Config::default())
    }

    /// Reads the persisted high score; any absence or corruption reads
    /// as zero.
    fn high_score(&self) -> u64 {
        self.read_document(&self.high_score_path)
            .and_then(|doc| doc.get("highScore").and_then(Value::as_u64))
            .unwrap_or(0)
    }

    fn set_high_score(&self, value: u64) -> Result<(), ConfigError> {
        self.write_document(&self.high_score_path, &json!({ "highScore": value }))
    }
}
