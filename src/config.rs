//! Conversion options and `bp2bst.toml` loading.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "bp2bst.toml";

/// Maps dependency module names matching `pattern` to elements under `prefix`.
#[derive(Debug, Clone)]
pub struct DependencyRule {
    pub pattern: Regex,
    pub prefix: String,
}

/// Knobs the converter reads while building descriptors.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Directory assumed for dependencies no rule matches.
    pub dependency_prefix: String,
    /// Checked in order before falling back to `dependency_prefix`.
    pub dependency_rules: Vec<DependencyRule>,
    /// Elements every generated C/C++ element depends on.
    pub base_depends: Vec<String>,
    /// Emitted as a `local_external` source when set.
    pub source_dir: Option<String>,
    /// Directory prepended to generated element file names.
    pub output_prefix: Option<String>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            dependency_prefix: "external".to_string(),
            dependency_rules: Vec::new(),
            base_depends: vec!["base/aosp-sdk.bst".to_string()],
            source_dir: None,
            output_prefix: None,
        }
    }
}

impl ConvertOptions {
    /// Best-effort element path for a dependency named in `static_libs` etc.
    ///
    /// Only the name is consulted; the source tree is never searched, so a
    /// library living somewhere else needs a rule or a manual fix.
    pub fn dependency_path(&self, module_name: &str) -> String {
        let prefix = self
            .dependency_rules
            .iter()
            .find(|rule| rule.pattern.is_match(module_name))
            .map(|rule| rule.prefix.as_str())
            .unwrap_or(&self.dependency_prefix);
        format!("{}/{}.bst", prefix.trim_end_matches('/'), module_name)
    }
}

/// Configuration loading error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse bp2bst.toml: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid dependency pattern \"{pattern}\": {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
}

/// On-disk form of `bp2bst.toml`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub dependency_prefix: Option<String>,
    pub base_depends: Option<Vec<String>>,
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub dependency_rules: Vec<RuleConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    pub pattern: String,
    pub prefix: String,
}

impl FileConfig {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Lay this file's values over the built-in defaults.
    pub fn to_options(&self) -> Result<ConvertOptions, ConfigError> {
        let mut options = ConvertOptions::default();
        if let Some(prefix) = &self.dependency_prefix {
            options.dependency_prefix = prefix.clone();
        }
        if let Some(base) = &self.base_depends {
            options.base_depends = base.clone();
        }
        for rule in &self.dependency_rules {
            let pattern = Regex::new(&rule.pattern).map_err(|source| {
                ConfigError::InvalidPattern {
                    pattern: rule.pattern.clone(),
                    source,
                }
            })?;
            options.dependency_rules.push(DependencyRule {
                pattern,
                prefix: rule.prefix.clone(),
            });
        }
        Ok(options)
    }
}

pub fn load_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let text = fs::read_to_string(path)?;
    FileConfig::parse(&text)
}

/// Find `bp2bst.toml` by walking up from `start`.
pub fn find_config_from(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_dependency_path() {
        let options = ConvertOptions::default();
        assert_eq!(options.dependency_path("libz"), "external/libz.bst");
    }

    #[test]
    fn test_rules_take_precedence() {
        let config = FileConfig::parse(
            r#"
dependency-prefix = "vendor/"

[[dependency-rules]]
pattern = "^libz"
prefix = "external/zlib"
"#,
        )
        .unwrap();
        let options = config.to_options().unwrap();
        assert_eq!(options.dependency_path("libz"), "external/zlib/libz.bst");
        assert_eq!(options.dependency_path("libpng"), "vendor/libpng.bst");
    }

    #[test]
    fn test_bad_pattern_is_reported() {
        let config = FileConfig::parse(
            r#"
[[dependency-rules]]
pattern = "("
prefix = "x"
"#,
        )
        .unwrap();
        let err = config.to_options().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(matches!(
            FileConfig::parse("colour = \"red\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_find_config_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "base-depends = []\n").unwrap();

        let found = find_config_from(&nested).unwrap();
        assert_eq!(found, dir.path().join(CONFIG_FILE_NAME));
        let options = load_config(&found).unwrap().to_options().unwrap();
        assert!(options.base_depends.is_empty());
    }
}
