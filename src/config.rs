//! Configuration file handling.
//!
//! Settings are read from `.ghstat.toml`, then overridden by explicit
//! command-line flags and environment variables. Credentials are never
//! stored in the file.

use crate::github::client::DEFAULT_API_URL;
use crate::stats::{EngineConfig, Filter, DEFAULT_CONCURRENCY};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".ghstat.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Account settings.
    #[serde(default)]
    pub account: AccountConfig,

    /// Repository and language filters.
    #[serde(default)]
    pub filter: FilterConfig,

    /// Per-repository statistics.
    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    /// Rendered outputs.
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Login to aggregate.
    #[serde(default)]
    pub login: Option<String>,

    /// GitHub API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            login: None,
            api_url: default_api_url(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

/// Filter settings. Names are matched case-insensitively.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub exclude_repos: Vec<String>,

    #[serde(default)]
    pub exclude_langs: Vec<String>,

    /// Owners counted as the account's own. Empty means the login only.
    #[serde(default)]
    pub include_owners: Vec<String>,

    #[serde(default)]
    pub ignore_forked_repos: bool,

    #[serde(default)]
    pub ignore_archived_repos: bool,

    #[serde(default)]
    pub ignore_private_repos: bool,

    #[serde(default)]
    pub ignore_contributed_to_repos: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(default)]
    pub ignore_lines_changed: bool,

    #[serde(default)]
    pub ignore_repo_views: bool,

    /// Number of enrichment requests in flight.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            ignore_lines_changed: false,
            ignore_repo_views: false,
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory the cards are written to.
    #[serde(default = "default_directory")]
    pub directory: String,

    /// Animate the rendered cards.
    #[serde(default)]
    pub animation: bool,

    /// Also write the aggregated record to `data.json`.
    #[serde(default)]
    pub debug: bool,

    /// URL receiving the aggregated record.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            animation: false,
            debug: false,
            webhook_url: None,
        }
    }
}

fn default_directory() -> String {
    "output".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.ghstat.toml` from `dir`.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(DEFAULT_CONFIG_FILE);

        if path.exists() {
            Ok(Some(Self::load(&path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Lists and values override the file only when given; switches only
    /// ever turn a setting on.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(login) = args.login() {
            self.account.login = Some(login.to_string());
        }
        if args.api_url != DEFAULT_API_URL {
            self.account.api_url = args.api_url.clone();
        }

        if let Some(ref repos) = args.exclude_repos {
            self.filter.exclude_repos = repos.clone();
        }
        if let Some(ref langs) = args.exclude_langs {
            self.filter.exclude_langs = langs.clone();
        }
        if let Some(ref owners) = args.include_owners {
            self.filter.include_owners = owners.clone();
        }

        self.filter.ignore_forked_repos |= args.ignore_forked_repos;
        self.filter.ignore_archived_repos |= args.ignore_archived_repos;
        self.filter.ignore_private_repos |= args.ignore_private_repos;
        self.filter.ignore_contributed_to_repos |= args.ignore_contributed_to_repos;
        self.enrichment.ignore_lines_changed |= args.ignore_lines_changed;
        self.enrichment.ignore_repo_views |= args.ignore_repo_views;

        if let Some(concurrency) = args.concurrency {
            self.enrichment.concurrency = concurrency;
        }

        if args.output.as_os_str() != "output" {
            self.output.directory = args.output.display().to_string();
        }
        self.output.animation |= args.animation;
        self.output.debug |= args.debug;
        if let Some(ref url) = args.webhook_url {
            self.output.webhook_url = Some(url.clone());
        }
    }

    /// Login to aggregate, if one was configured.
    pub fn login(&self) -> Option<&str> {
        self.account
            .login
            .as_deref()
            .map(str::trim)
            .filter(|login| !login.is_empty())
    }

    /// Webhook target, ignoring an empty value.
    pub fn webhook_url(&self) -> Option<&str> {
        self.output
            .webhook_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
    }

    /// Build the engine configuration for `login`.
    ///
    /// Owners default to the login itself.
    pub fn engine_config(&self, login: &str) -> EngineConfig {
        let owners: Vec<&str> = if self.filter.include_owners.iter().all(|o| o.trim().is_empty()) {
            vec![login]
        } else {
            self.filter.include_owners.iter().map(String::as_str).collect()
        };

        let filter = Filter::new(owners)
            .exclude_repos(&self.filter.exclude_repos)
            .exclude_langs(&self.filter.exclude_langs)
            .ignore_forked_repos(self.filter.ignore_forked_repos)
            .ignore_archived_repos(self.filter.ignore_archived_repos)
            .ignore_private_repos(self.filter.ignore_private_repos);

        let mut engine = EngineConfig::new(login, filter);
        engine.ignore_contributed_to_repos = self.filter.ignore_contributed_to_repos;
        engine.ignore_lines_changed = self.enrichment.ignore_lines_changed;
        engine.ignore_repo_views = self.enrichment.ignore_repo_views;
        engine.concurrency = self.enrichment.concurrency;
        engine
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.account.api_url, "https://api.github.com");
        assert_eq!(config.enrichment.concurrency, 10);
        assert_eq!(config.output.directory, "output");
        assert!(config.login().is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[account]
login = "octocat"

[filter]
exclude_langs = ["HTML", "CSS"]
ignore_forked_repos = true

[enrichment]
ignore_repo_views = true
concurrency = 4

[output]
animation = true
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.login(), Some("octocat"));
        assert_eq!(config.filter.exclude_langs, vec!["HTML", "CSS"]);
        assert!(config.filter.ignore_forked_repos);
        assert!(!config.filter.ignore_private_repos);
        assert!(config.enrichment.ignore_repo_views);
        assert_eq!(config.enrichment.concurrency, 4);
        assert!(config.output.animation);
        assert_eq!(config.output.directory, "output");
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from_dir(dir.path()).unwrap().is_none());

        let mut file = std::fs::File::create(dir.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        writeln!(file, "[filter]\ninclude_owners = [\"me\", \"my-org\"]").unwrap();

        let config = Config::load_from_dir(dir.path()).unwrap().unwrap();
        assert_eq!(config.filter.include_owners, vec!["me", "my-org"]);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "[filter\n").unwrap();
        assert!(Config::load_from_dir(dir.path()).is_err());
    }

    #[test]
    fn test_merge_with_args() {
        let mut config = Config::default();
        config.filter.exclude_langs = vec!["HTML".to_string()];
        config.filter.ignore_archived_repos = true;
        config.enrichment.concurrency = 4;

        let args = Args::try_parse_from([
            "ghstat",
            "--user",
            "me",
            "--exclude-repos",
            "me/secret",
            "--ignore-repo-views",
            "--output",
            "cards",
        ])
        .unwrap();
        config.merge_with_args(&args);

        assert_eq!(config.login(), Some("me"));
        assert_eq!(config.filter.exclude_repos, vec!["me/secret"]);
        assert_eq!(config.filter.exclude_langs, vec!["HTML"]);
        assert!(config.filter.ignore_archived_repos);
        assert!(config.enrichment.ignore_repo_views);
        assert_eq!(config.enrichment.concurrency, 4);
        assert_eq!(config.output.directory, "cards");
    }

    #[test]
    fn test_engine_config_defaults_owner_to_login() {
        let config = Config::default();
        let engine = config.engine_config("Me");

        assert_eq!(engine.login, "Me");
        assert!(engine.filter.includes_owner("me"));
        assert!(!engine.filter.includes_owner("other"));
        assert_eq!(engine.concurrency, DEFAULT_CONCURRENCY);
        assert!(engine.validate().is_ok());
    }

    #[test]
    fn test_engine_config_carries_toggles() {
        let mut config = Config::default();
        config.filter.include_owners = vec!["org".to_string()];
        config.filter.exclude_langs = vec!["html".to_string()];
        config.filter.ignore_contributed_to_repos = true;
        config.enrichment.ignore_lines_changed = true;

        let engine = config.engine_config("me");

        assert!(engine.filter.includes_owner("org"));
        assert!(!engine.filter.includes_owner("me"));
        assert!(engine.filter.excludes_language("HTML"));
        assert!(engine.ignore_contributed_to_repos);
        assert!(engine.ignore_lines_changed);
        assert!(!engine.ignore_repo_views);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[account]"));
        assert!(toml_str.contains("[filter]"));
        assert!(toml_str.contains("[enrichment]"));
        assert!(toml_str.contains("[output]"));
        assert!(!toml_str.contains("token"));
    }
}
