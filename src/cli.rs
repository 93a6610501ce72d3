//! Command-line interface argument parsing.
//!
//! Every setting can also come from the environment, using the variable
//! names of the GitHub Actions workflow the cards are usually built in.

use crate::github::client::DEFAULT_API_URL;
use crate::stats::MAX_CONCURRENCY;
use clap::builder::FalseyValueParser;
use clap::Parser;
use std::path::PathBuf;

/// ghstat - GitHub activity rendered as SVG stat cards
///
/// Aggregates stars, forks, languages, traffic, line changes and
/// contributions across an account's repositories.
///
/// Examples:
///   ghstat --user octocat --token ghp_xxx
///   ACCESS_TOKEN=ghp_xxx CUSTOM_ACTOR=octocat ghstat --output cards
///   ghstat --exclude-langs html,css --ignore-forked-repos --debug
///   ghstat --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// GitHub login to aggregate
    #[arg(short, long, value_name = "LOGIN", env = "CUSTOM_ACTOR")]
    pub user: Option<String>,

    /// Login of the workflow actor, used when --user is not set
    #[arg(long, value_name = "LOGIN", env = "GITHUB_ACTOR", hide = true)]
    pub actor: Option<String>,

    /// Personal access token
    ///
    /// Falls back to GITHUB_TOKEN when this token is missing or rejected.
    #[arg(short, long, value_name = "TOKEN", env = "ACCESS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Workflow token, used when --token is missing or invalid
    #[arg(long, value_name = "TOKEN", env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// GitHub API base URL
    #[arg(long, default_value = DEFAULT_API_URL, env = "GITHUB_API_URL")]
    pub api_url: String,

    /// Output directory for the SVG cards
    #[arg(short, long, default_value = "output", value_name = "DIR")]
    pub output: PathBuf,

    /// Path to configuration file
    ///
    /// If not specified, looks for .ghstat.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Also write the aggregated record to data.json
    #[arg(long)]
    pub debug: bool,

    /// Animate the rendered cards
    #[arg(long, env = "ANIMATION", value_parser = FalseyValueParser::new())]
    pub animation: bool,

    /// Number of concurrent enrichment requests
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Repositories to leave out (comma-separated owner/name)
    #[arg(long, value_name = "REPOS", value_delimiter = ',', env = "EXCLUDE_REPOS")]
    pub exclude_repos: Option<Vec<String>>,

    /// Languages to leave out of the language card (comma-separated)
    #[arg(long, value_name = "LANGS", value_delimiter = ',', env = "EXCLUDE_LANGS")]
    pub exclude_langs: Option<Vec<String>>,

    /// Owners whose repositories count as the account's own (comma-separated)
    ///
    /// Defaults to the aggregated login.
    #[arg(long, value_name = "OWNERS", value_delimiter = ',', env = "INCLUDE_OWNER")]
    pub include_owners: Option<Vec<String>>,

    #[arg(long, env = "IGNORE_FORKED_REPOS", value_parser = FalseyValueParser::new())]
    pub ignore_forked_repos: bool,

    #[arg(long, env = "IGNORE_ARCHIVED_REPOS", value_parser = FalseyValueParser::new())]
    pub ignore_archived_repos: bool,

    #[arg(long, env = "IGNORE_PRIVATE_REPOS", value_parser = FalseyValueParser::new())]
    pub ignore_private_repos: bool,

    /// Skip the contributed-to listing
    #[arg(long, env = "IGNORE_CONTRIBUTED_TO_REPOS", value_parser = FalseyValueParser::new())]
    pub ignore_contributed_to_repos: bool,

    /// Skip per-repository line change statistics
    #[arg(long, env = "IGNORE_LINES_CHANGED", value_parser = FalseyValueParser::new())]
    pub ignore_lines_changed: bool,

    /// Skip per-repository traffic views
    #[arg(long, env = "IGNORE_REPO_VIEWS", value_parser = FalseyValueParser::new())]
    pub ignore_repo_views: bool,

    /// URL receiving the aggregated record as JSON
    #[arg(long, value_name = "URL", env = "WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Generate a default .ghstat.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(concurrency) = self.concurrency {
            if !(1..=MAX_CONCURRENCY).contains(&concurrency) {
                return Err(format!(
                    "Concurrency must be between 1 and {}",
                    MAX_CONCURRENCY
                ));
            }
        }

        if !is_http_url(&self.api_url) {
            return Err("API URL must start with 'http://' or 'https://'".to_string());
        }

        if let Some(url) = self.webhook_url.as_deref().filter(|u| !u.is_empty()) {
            if !is_http_url(url) {
                return Err("Webhook URL must start with 'http://' or 'https://'".to_string());
            }
        }

        Ok(())
    }

    /// Login given on the command line, or the workflow actor.
    pub fn login(&self) -> Option<&str> {
        self.user
            .as_deref()
            .or(self.actor.as_deref())
            .map(str::trim)
            .filter(|login| !login.is_empty())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            user: Some("octocat".to_string()),
            actor: None,
            token: None,
            github_token: None,
            api_url: DEFAULT_API_URL.to_string(),
            output: PathBuf::from("output"),
            config: None,
            verbose: false,
            quiet: false,
            debug: false,
            animation: false,
            concurrency: None,
            exclude_repos: None,
            exclude_langs: None,
            include_owners: None,
            ignore_forked_repos: false,
            ignore_archived_repos: false,
            ignore_private_repos: false,
            ignore_contributed_to_repos: false,
            ignore_lines_changed: false,
            ignore_repo_views: false,
            webhook_url: None,
            init_config: false,
        }
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_concurrency_range() {
        let mut args = make_args();
        args.concurrency = Some(0);
        assert!(args.validate().is_err());

        args.concurrency = Some(MAX_CONCURRENCY + 1);
        assert!(args.validate().is_err());

        args.concurrency = Some(8);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_urls() {
        let mut args = make_args();
        args.webhook_url = Some("ftp://example.com".to_string());
        assert!(args.validate().is_err());

        args.webhook_url = Some(String::new());
        assert!(args.validate().is_ok());

        args.api_url = "api.github.com".to_string();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_login_falls_back_to_actor() {
        let mut args = make_args();
        args.user = None;
        assert_eq!(args.login(), None);

        args.actor = Some("workflow-bot".to_string());
        assert_eq!(args.login(), Some("workflow-bot"));

        args.user = Some("  ".to_string());
        assert_eq!(args.login(), None);
    }

    #[test]
    fn test_parse_list_flags() {
        let args = Args::try_parse_from([
            "ghstat",
            "--user",
            "me",
            "--exclude-langs",
            "HTML,CSS",
            "--ignore-forked-repos",
        ])
        .unwrap();
        assert_eq!(
            args.exclude_langs,
            Some(vec!["HTML".to_string(), "CSS".to_string()])
        );
        assert!(args.ignore_forked_repos);
        assert!(!args.ignore_private_repos);
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
