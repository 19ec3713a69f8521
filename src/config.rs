use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default database location, relative to `$HOME`.
pub const DEFAULT_DB_PATH: &str = "~/.doclabel.sqlite";
/// Default configuration file location, relative to `$HOME`.
pub const DEFAULT_CONFIG_PATH: &str = "~/.config/doclabel/doclabel.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub predict: PredictConfig,
    #[serde(default)]
    pub explain: ExplainConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from(DEFAULT_DB_PATH)
}

/// What to do with a label whose positive or negative example count is
/// below `training.min_examples`.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InsufficientPolicy {
    /// Warn, then fit the model anyway.
    #[default]
    Warn,
    /// Warn and leave the label without a new model.
    Skip,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TrainingConfig {
    #[serde(default = "default_min_examples")]
    pub min_examples: usize,
    #[serde(default)]
    pub insufficient_policy: InsufficientPolicy,
    #[serde(default = "default_ngram_min")]
    pub ngram_min: usize,
    #[serde(default = "default_ngram_max")]
    pub ngram_max: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            min_examples: default_min_examples(),
            insufficient_policy: InsufficientPolicy::default(),
            ngram_min: default_ngram_min(),
            ngram_max: default_ngram_max(),
        }
    }
}

fn default_min_examples() -> usize {
    3
}
fn default_ngram_min() -> usize {
    1
}
fn default_ngram_max() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    #[serde(default = "default_c")]
    pub c: f64,
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            c: default_c(),
            max_iter: default_max_iter(),
            tolerance: default_tolerance(),
        }
    }
}

fn default_c() -> f64 {
    1.0
}
fn default_max_iter() -> usize {
    1000
}
fn default_tolerance() -> f64 {
    1e-4
}

#[derive(Debug, Deserialize, Clone)]
pub struct PredictConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl Default for PredictConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

fn default_threshold() -> f64 {
    80.0
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExplainConfig {
    #[serde(default = "default_display_count")]
    pub display_count: usize,
}

impl Default for ExplainConfig {
    fn default() -> Self {
        Self {
            display_count: default_display_count(),
        }
    }
}

fn default_display_count() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractConfig {
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

fn default_max_file_bytes() -> u64 {
    50 * 1024 * 1024
}

impl Config {
    /// Built-in defaults with the database placed at `db_path`.
    pub fn with_db_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db: DbConfig {
                path: db_path.into(),
            },
            ..Self::default()
        }
    }
}

/// Expand a leading `~/` using `$HOME`. Other paths are returned unchanged.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

/// Load configuration for the CLI.
///
/// `explicit` is the `--config` flag. When it is absent the default location
/// is tried and silently skipped if no file exists there. `db_override` is the
/// `--database` flag and wins over `[db].path`.
pub fn resolve_config(explicit: Option<&Path>, db_override: Option<&Path>) -> Result<Config> {
    let mut config = match explicit {
        Some(path) => load_config(path)?,
        None => {
            let default_path = expand_home(Path::new(DEFAULT_CONFIG_PATH));
            if default_path.exists() {
                load_config(&default_path)?
            } else {
                Config::default()
            }
        }
    };

    if let Some(db) = db_override {
        config.db.path = db.to_path_buf();
    }
    config.db.path = expand_home(&config.db.path);

    validate(&config)?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.training.min_examples == 0 {
        anyhow::bail!("training.min_examples must be >= 1");
    }

    if config.training.ngram_min == 0 || config.training.ngram_min > config.training.ngram_max {
        anyhow::bail!(
            "training n-gram range must satisfy 1 <= ngram_min <= ngram_max (got {}..={})",
            config.training.ngram_min,
            config.training.ngram_max
        );
    }

    if !(config.classifier.c > 0.0) {
        anyhow::bail!("classifier.c must be > 0");
    }
    if config.classifier.max_iter == 0 {
        anyhow::bail!("classifier.max_iter must be >= 1");
    }
    if !(config.classifier.tolerance > 0.0) {
        anyhow::bail!("classifier.tolerance must be > 0");
    }

    if !(0.0..=100.0).contains(&config.predict.threshold) {
        anyhow::bail!("predict.threshold must be in [0, 100]");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.training.min_examples, 3);
        assert_eq!(config.training.ngram_min, 1);
        assert_eq!(config.training.ngram_max, 3);
        assert_eq!(config.training.insufficient_policy, InsufficientPolicy::Warn);
        assert_eq!(config.predict.threshold, 80.0);
        assert_eq!(config.explain.display_count, 10);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn skip_policy_parses() {
        let config: Config = toml::from_str(
            r#"
            [training]
            insufficient_policy = "skip"
            min_examples = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.training.insufficient_policy, InsufficientPolicy::Skip);
        assert_eq!(config.training.min_examples, 2);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let parsed: Result<Config, _> = toml::from_str(
            r#"
            [training]
            insufficient_policy = "sometimes"
            "#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn inverted_ngram_range_is_rejected() {
        let mut config = Config::default();
        config.training.ngram_min = 3;
        config.training.ngram_max = 1;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        let mut config = Config::default();
        config.predict.threshold = 120.0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn database_override_wins() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cfg_path = tmp.path().join("doclabel.toml");
        std::fs::write(&cfg_path, "[db]\npath = \"/somewhere/else.sqlite\"\n").unwrap();
        let db = tmp.path().join("override.sqlite");

        let config = resolve_config(Some(&cfg_path), Some(&db)).unwrap();
        assert_eq!(config.db.path, db);
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let missing = tmp.path().join("nope.toml");
        assert!(resolve_config(Some(&missing), None).is_err());
    }

    #[test]
    fn expand_home_leaves_absolute_paths() {
        let p = Path::new("/var/lib/doclabel.sqlite");
        assert_eq!(expand_home(p), p.to_path_buf());
    }
}
