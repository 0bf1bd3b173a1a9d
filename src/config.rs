use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the only registered pass; used when neither the CLI nor the
/// config file picks one.
pub const DEFAULT_TRANSFORMATION: &str = "substitute-class-template-param";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{}: could not read config file: {msg}", path.display())]
    Read { msg: String, path: PathBuf },

    #[error("{}: invalid config: {msg}", path.display())]
    Parse { msg: String, path: PathBuf },

    #[error("counter must be at least 1 (instances are numbered from 1)")]
    ZeroCounter,

    #[error("unknown transformation '{name}' (available: {available})")]
    UnknownTransformation { name: String, available: String },
}

/// Settings for one pass invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassConfig {
    pub transformation: String,
    /// 1-based ordinal of the occurrence to rewrite.
    pub counter: usize,
    /// Report the number of rewritable occurrences instead of rewriting.
    pub query_instances: bool,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self { transformation: DEFAULT_TRANSFORMATION.to_string(), counter: 1, query_instances: false }
    }
}

/// Values given on the command line; `None` leaves the file's value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub transformation: Option<String>,
    pub counter: Option<usize>,
    pub query_instances: bool,
}

// ---- TOML deserialization types ----

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    #[serde(default)]
    pass: TomlPass,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct TomlPass {
    transformation: Option<String>,
    counter: Option<usize>,
    query_instances: Option<bool>,
}

impl PassConfig {
    /// Loads `[pass]` settings from a TOML file, unset keys defaulted.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read { msg: e.to_string(), path: path.to_path_buf() })?;
        Self::from_toml_str(&content, path)
    }

    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let parsed: TomlConfig = toml::from_str(content)
            .map_err(|e| ConfigError::Parse { msg: e.message().to_string(), path: path.to_path_buf() })?;
        let defaults = PassConfig::default();
        Ok(Self {
            transformation: parsed.pass.transformation.unwrap_or(defaults.transformation),
            counter: parsed.pass.counter.unwrap_or(defaults.counter),
            query_instances: parsed.pass.query_instances.unwrap_or(defaults.query_instances),
        })
    }

    /// Command-line values win over the file.
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(name) = overrides.transformation {
            self.transformation = name;
        }
        if let Some(counter) = overrides.counter {
            self.counter = counter;
        }
        self.query_instances |= overrides.query_instances;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.counter == 0 && !self.query_instances {
            return Err(ConfigError::ZeroCounter);
        }
        Ok(())
    }

    /// File (if any) layered under the command line, then validated.
    pub fn resolve(file: Option<&Path>, overrides: Overrides) -> Result<Self, ConfigError> {
        let base = match file {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        let config = base.with_overrides(overrides);
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<PassConfig, ConfigError> {
        PassConfig::from_toml_str(content, Path::new("reduce.toml"))
    }

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(parse("").unwrap(), PassConfig::default());
    }

    #[test]
    fn pass_section_is_read() {
        let cfg = parse("[pass]\ncounter = 3\nquery-instances = true\n").unwrap();
        assert_eq!(cfg.counter, 3);
        assert!(cfg.query_instances);
        assert_eq!(cfg.transformation, DEFAULT_TRANSFORMATION);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse("[pass]\ncountr = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().starts_with("reduce.toml: invalid config"));
    }

    #[test]
    fn command_line_wins() {
        let cfg = parse("[pass]\ncounter = 3\n").unwrap().with_overrides(Overrides {
            counter: Some(5),
            ..Overrides::default()
        });
        assert_eq!(cfg.counter, 5);
    }

    #[test]
    fn zero_counter_is_rejected_unless_querying() {
        let zero = PassConfig { counter: 0, ..PassConfig::default() };
        assert_eq!(zero.validate(), Err(ConfigError::ZeroCounter));
        let query = PassConfig { counter: 0, query_instances: true, ..PassConfig::default() };
        assert!(query.validate().is_ok());
    }

    #[test]
    fn resolve_reads_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reduce.toml");
        std::fs::write(&path, "[pass]\ncounter = 2\n").unwrap();
        let cfg = PassConfig::resolve(Some(&path), Overrides::default()).unwrap();
        assert_eq!(cfg.counter, 2);

        let missing = PassConfig::resolve(Some(&dir.path().join("nope.toml")), Overrides::default());
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
