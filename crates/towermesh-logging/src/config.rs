//! Logging settings
//!
//! A [`LogConfig`] says which events pass (a level plus optional per-target
//! directives) and where they go: the console, a log directory, or both.
//! JSONL events always carry the current span and the span list, so the
//! `tower` span of the emitting tower is in every line.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where and how events are written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Level used when `RUST_LOG` is unset
    pub level: String,

    /// Extra filter directives, e.g. `towermesh_node=trace`
    #[serde(default)]
    pub directives: Vec<String>,

    #[serde(default)]
    pub console: ConsoleOutput,

    /// JSONL log files, if any
    #[serde(default)]
    pub file: Option<FileConfig>,

    /// Add file and line to JSONL events
    #[serde(default)]
    pub source_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directives: Vec::new(),
            console: ConsoleOutput::Jsonl,
            file: None,
            source_location: false,
        }
    }
}

impl LogConfig {
    /// Long simulation runs: debug events to daily JSONL files, nothing on
    /// the console
    pub fn simulation(directory: PathBuf) -> Self {
        Self {
            level: "debug".to_string(),
            console: ConsoleOutput::Off,
            file: Some(FileConfig {
                directory,
                ..FileConfig::default()
            }),
            ..Self::default()
        }
    }

    /// Warnings only, readable in captured test output
    pub fn testing() -> Self {
        Self {
            level: "warn".to_string(),
            console: ConsoleOutput::Pretty { ansi: false },
            ..Self::default()
        }
    }

    /// Add a filter directive
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }
}

/// Console output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum ConsoleOutput {
    Off,
    /// One JSON object per line on stdout
    #[default]
    Jsonl,
    /// Human-readable lines
    Pretty { ansi: bool },
}

/// JSONL file output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub directory: PathBuf,
    /// File names start with this
    pub prefix: String,
    pub rotation: RotationStrategy,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./logs"),
            prefix: "towermesh".to_string(),
            rotation: RotationStrategy::Daily,
        }
    }
}

/// When to start a new log file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationStrategy {
    #[default]
    Daily,
    Hourly,
    /// One file, truncated on start
    Never,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_jsonl_console() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.console, ConsoleOutput::Jsonl);
        assert!(config.file.is_none());
        assert!(config.directives.is_empty());
    }

    #[test]
    fn test_simulation_writes_files_only() {
        let config = LogConfig::simulation(PathBuf::from("/tmp/towermesh-logs"));
        assert_eq!(config.console, ConsoleOutput::Off);
        let file = config.file.unwrap();
        assert_eq!(file.directory, PathBuf::from("/tmp/towermesh-logs"));
        assert_eq!(file.prefix, "towermesh");
        assert_eq!(file.rotation, RotationStrategy::Daily);
    }

    #[test]
    fn test_config_from_json() {
        let config: LogConfig = serde_json::from_str(
            r#"{
                "level": "debug",
                "directives": ["towermesh_routing=trace"],
                "console": { "format": "pretty", "ansi": true },
                "file": { "directory": "out", "prefix": "run", "rotation": "never" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.console, ConsoleOutput::Pretty { ansi: true });
        assert_eq!(config.directives, vec!["towermesh_routing=trace"]);
        assert_eq!(config.file.unwrap().rotation, RotationStrategy::Never);
        assert!(!config.source_location);
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let config: LogConfig = serde_json::from_str(r#"{ "level": "warn" }"#).unwrap();
        assert_eq!(config.console, ConsoleOutput::Jsonl);
        assert!(config.file.is_none());
    }
}
