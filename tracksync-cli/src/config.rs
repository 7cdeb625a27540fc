use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracksync::{ConflictPolicy, NamingPattern, SyncOptions, DEFAULT_PATTERN};

/// What `--ignore-all` does with tracks already on the device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IgnoreAllPolicy {
    /// Copy anyway, overwriting a file at the same path
    #[default]
    Copy,
    /// Leave the existing track alone
    Skip,
}

impl From<IgnoreAllPolicy> for ConflictPolicy {
    fn from(policy: IgnoreAllPolicy) -> Self {
        match policy {
            IgnoreAllPolicy::Copy => ConflictPolicy::CopyAll,
            IgnoreAllPolicy::Skip => ConflictPolicy::SkipAll,
        }
    }
}

/// Settings read from `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub pattern: Option<String>,
    pub local_dirs: Vec<PathBuf>,
    pub ignore_all_policy: IgnoreAllPolicy,
    pub dry_run: bool,
    pub log_level: Option<String>,
}

/// Command line values that take part in building `SyncOptions`
#[derive(Debug, Clone, Default)]
pub struct SyncOverrides {
    pub pattern: Option<String>,
    pub local_dirs: Vec<PathBuf>,
    pub ignore_all: bool,
    pub ignore_all_policy: Option<IgnoreAllPolicy>,
    pub dry_run: bool,
}

impl CliConfig {
    /// `<config_dir>/tracksync/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tracksync").join("config.toml"))
    }

    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let config: CliConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
        Ok(config)
    }

    /// Load `explicit` if given, else the default file when it exists
    pub async fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path).await;
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(path).await,
            _ => Ok(Self::default()),
        }
    }

    /// Merge with command line values; flags win, local dirs accumulate
    pub fn sync_options(&self, overrides: &SyncOverrides) -> Result<SyncOptions> {
        let pattern_text = overrides
            .pattern
            .as_deref()
            .or(self.pattern.as_deref())
            .unwrap_or(DEFAULT_PATTERN);
        let pattern = NamingPattern::parse(pattern_text)?;

        let local_roots = self
            .local_dirs
            .iter()
            .chain(&overrides.local_dirs)
            .map(|dir| expand_home(dir))
            .collect();

        let conflict_policy = if overrides.ignore_all {
            overrides.ignore_all_policy.unwrap_or(self.ignore_all_policy).into()
        } else {
            ConflictPolicy::Prompt
        };

        Ok(SyncOptions {
            pattern,
            local_roots,
            conflict_policy,
            dry_run: overrides.dry_run || self.dry_run,
        })
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
