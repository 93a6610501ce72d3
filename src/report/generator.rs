//! SVG card and JSON generation.
//!
//! Two cards are produced from a finished [`Stats`] record: an overview of
//! account-wide counters and a language breakdown. Both are tera templates
//! rendered with autoescaping, so names from the API cannot break the markup.

use crate::models::Stats;
use anyhow::{Context as _, Result};
use chrono::Datelike;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};

pub const OVERVIEW_FILE: &str = "overview.svg";
pub const LANGUAGES_FILE: &str = "languages.svg";
pub const DATA_FILE: &str = "data.json";

/// Delay between the fade-in of consecutive card rows.
pub const ANIMATION_STAGGER_MS: usize = 150;

const STYLE_TEMPLATE: &str = include_str!("templates/style.svg");
const OVERVIEW_TEMPLATE: &str = include_str!("templates/overview.svg");
const LANGUAGES_TEMPLATE: &str = include_str!("templates/languages.svg");

const FALLBACK_COLOR: &str = "#858585";

/// 16px octicon paths used by the overview rows.
mod octicons {
    pub const STAR: &str = "M8 .25a.75.75 0 01.673.418l1.882 3.815 4.21.612a.75.75 0 01.416 1.279l-3.046 2.97.719 4.192a.75.75 0 01-1.088.791L8 12.347l-3.766 1.98a.75.75 0 01-1.088-.79l.72-4.194L.818 6.374a.75.75 0 01.416-1.28l4.21-.611L7.327.668A.75.75 0 018 .25zm0 2.445L6.615 5.5a.75.75 0 01-.564.41l-3.097.45 2.24 2.184a.75.75 0 01.216.664l-.528 3.084 2.769-1.456a.75.75 0 01.698 0l2.77 1.456-.53-3.084a.75.75 0 01.216-.664l2.24-2.183-3.096-.45a.75.75 0 01-.564-.41L8 2.694v.001z";
    pub const REPO_FORKED: &str = "M5 3.25a.75.75 0 11-1.5 0 .75.75 0 011.5 0zm0 2.122a2.25 2.25 0 10-1.5 0v.878A2.25 2.25 0 005.75 8.5h1.5v2.128a2.251 2.251 0 101.5 0V8.5h1.5a2.25 2.25 0 002.25-2.25v-.878a2.25 2.25 0 10-1.5 0v.878a.75.75 0 01-.75.75h-4.5A.75.75 0 015 6.25v-.878zm3.75 7.378a.75.75 0 11-1.5 0 .75.75 0 011.5 0zm3-8.75a.75.75 0 100-1.5.75.75 0 000 1.5z";
    pub const DIFF: &str = "M8.75 1.75a.75.75 0 00-1.5 0V5H4a.75.75 0 000 1.5h3.25v3.25a.75.75 0 001.5 0V6.5H12A.75.75 0 0012 5H8.75V1.75zM4 13a.75.75 0 000 1.5h8a.75.75 0 100-1.5H4z";
    pub const GIT_COMMIT: &str = "M10.5 7.75a2.5 2.5 0 11-5 0 2.5 2.5 0 015 0zm1.43.75a4.002 4.002 0 01-7.86 0H.75a.75.75 0 110-1.5h3.32a4.001 4.001 0 017.86 0h3.32a.75.75 0 110 1.5h-3.32z";
    pub const EYE: &str = "M1.679 7.932c.412-.621 1.242-1.75 2.366-2.717C5.175 4.242 6.527 3.5 8 3.5c1.473 0 2.824.742 3.955 1.715 1.124.967 1.954 2.096 2.366 2.717a.119.119 0 010 .136c-.412.621-1.242 1.75-2.366 2.717C10.825 11.758 9.473 12.5 8 12.5c-1.473 0-2.824-.742-3.955-1.715C2.92 9.818 2.09 8.69 1.679 8.068a.119.119 0 010-.136zM8 2c-1.981 0-3.67.992-4.933 2.078C1.797 5.169.88 6.423.43 7.1a1.619 1.619 0 000 1.798c.45.678 1.367 1.932 2.637 3.024C4.329 13.008 6.019 14 8 14c1.981 0 3.67-.992 4.933-2.078 1.27-1.091 2.187-2.345 2.637-3.023a1.619 1.619 0 000-1.798c-.45-.678-1.367-1.932-2.637-3.023C11.671 2.992 9.981 2 8 2zm0 8a2 2 0 100-4 2 2 0 000 4z";
    pub const GIT_PULL_REQUEST: &str = "M7.177 3.073L9.573.677A.25.25 0 0110 .854v4.792a.25.25 0 01-.427.177L7.177 3.427a.25.25 0 010-.354zM3.75 2.5a.75.75 0 100 1.5.75.75 0 000-1.5zm-2.25.75a2.25 2.25 0 113 2.122v5.256a2.251 2.251 0 11-1.5 0V5.372A2.25 2.25 0 011.5 3.25zM11 2.5h-1V4h1a1 1 0 011 1v5.628a2.251 2.251 0 101.5 0V5A2.5 2.5 0 0011 2.5zm1 10.25a.75.75 0 111.5 0 .75.75 0 01-1.5 0zM3.75 12a.75.75 0 100 1.5.75.75 0 000-1.5z";
    pub const REPO_PUSH: &str = "M1 2.5A2.5 2.5 0 013.5 0h8.75a.75.75 0 01.75.75v3.5a.75.75 0 01-1.5 0V1.5h-8a1 1 0 00-1 1v6.708A2.492 2.492 0 013.5 9h3.25a.75.75 0 010 1.5H3.5a1 1 0 100 2h5.75a.75.75 0 010 1.5H3.5A2.5 2.5 0 011 11.5v-9zm13.23 7.79a.75.75 0 001.06-1.06l-2.505-2.505a.75.75 0 00-1.06 0L9.22 9.229a.75.75 0 001.06 1.061l1.225-1.224v6.184a.75.75 0 001.5 0V9.066l1.224 1.224z";
    pub const REPO: &str = "M2 2.5A2.5 2.5 0 014.5 0h8.75a.75.75 0 01.75.75v12.5a.75.75 0 01-.75.75h-2.5a.75.75 0 110-1.5h1.75v-2h-8a1 1 0 00-.714 1.7.75.75 0 01-1.072 1.05A2.495 2.495 0 012 11.5v-9zm10.5-1V9h-8c-.356 0-.694.074-1 .208V2.5a1 1 0 011-1h8zM5 12.25v3.25a.25.25 0 00.4.2l1.45-1.087a.25.25 0 01.3 0L8.6 15.7a.25.25 0 00.4-.2v-3.25a.25.25 0 00-.25-.25h-3.5a.25.25 0 00-.25.25z";
}

fn octicon(path: &str) -> String {
    format!(
        "<svg class=\"octicon\" viewBox=\"0 0 16 16\" version=\"1.1\" width=\"16\" height=\"16\"><path fill-rule=\"evenodd\" d=\"{}\"></path></svg>",
        path
    )
}

/// One row of the overview card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverviewItem {
    /// Inline octicon markup.
    pub icon: String,
    pub name: String,
    pub value: u64,
}

impl OverviewItem {
    fn new(icon: &str, name: impl Into<String>, value: u64) -> Self {
        Self {
            icon: octicon(icon),
            name: name.into(),
            value,
        }
    }
}

/// Rows of the overview card.
///
/// Line changes and views fall back to this year's commit and pull request
/// counts when their enrichment was disabled.
pub fn overview_items(stats: &Stats, year: i32) -> Vec<OverviewItem> {
    let mut items = vec![
        OverviewItem::new(octicons::STAR, "Stars", stats.stargazers),
        OverviewItem::new(octicons::REPO_FORKED, "Forks", stats.forks),
    ];

    items.push(match stats.line_changes {
        Some(lines) => OverviewItem::new(
            octicons::DIFF,
            "Lines of code changed",
            lines.additions + lines.deletions,
        ),
        None => OverviewItem::new(
            octicons::GIT_COMMIT,
            format!("Total commits ({})", year),
            stats.contributions.total_commit_contributions,
        ),
    });

    items.push(match stats.views {
        Some(views) => OverviewItem::new(
            octicons::EYE,
            "Repository views (past two weeks)",
            views.count,
        ),
        None => OverviewItem::new(
            octicons::GIT_PULL_REQUEST,
            format!("Total pull requests ({})", year),
            stats.contributions.total_pull_request_contributions,
        ),
    });

    items.push(OverviewItem::new(
        octicons::REPO_PUSH,
        "All-time contributions",
        stats.contributions.total_contributions,
    ));
    items.push(OverviewItem::new(
        octicons::REPO,
        "Repositories with contributions",
        stats.repos_count() as u64,
    ));
    items
}

#[derive(Debug, Serialize)]
struct LanguageRow<'a> {
    name: &'a str,
    color: &'a str,
    percent: String,
}

/// Renders the cards from the embedded templates.
pub struct CardRenderer {
    tera: Tera,
}

impl CardRenderer {
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![".svg"]);
        tera.add_raw_templates(vec![
            ("style.svg", STYLE_TEMPLATE),
            (OVERVIEW_FILE, OVERVIEW_TEMPLATE),
            (LANGUAGES_FILE, LANGUAGES_TEMPLATE),
        ])?;

        Ok(Self { tera })
    }

    fn context(animation: bool, height: usize) -> Context {
        let mut context = Context::new();
        context.insert("animation", &animation);
        context.insert("stagger", &ANIMATION_STAGGER_MS);
        context.insert("height", &height);
        context
    }

    /// Render the overview card.
    pub fn overview(&self, stats: &Stats, animation: bool, year: i32) -> Result<String> {
        let mut context = Self::context(animation, 210);
        context.insert("name", &stats.name);
        context.insert("items", &overview_items(stats, year));

        Ok(self.tera.render(OVERVIEW_FILE, &context)?)
    }

    /// Render the language card, largest language first.
    pub fn languages(&self, stats: &Stats, animation: bool) -> Result<String> {
        let rows: Vec<LanguageRow<'_>> = stats
            .languages_by_size()
            .into_iter()
            .map(|lang| LanguageRow {
                name: &lang.name,
                color: lang.color.as_deref().unwrap_or(FALLBACK_COLOR),
                percent: lang.percent(),
            })
            .collect();

        let mut context = Self::context(animation, 110 + rows.len().div_ceil(2) * 21);
        context.insert("languages", &rows);

        Ok(self.tera.render(LANGUAGES_FILE, &context)?)
    }
}

/// Generate a JSON dump of the record.
pub fn generate_json_report(stats: &Stats) -> Result<String> {
    serde_json::to_string_pretty(stats).map_err(Into::into)
}

/// Write both cards, plus `data.json` when `debug` is set.
///
/// Returns the paths written.
pub fn write_outputs(stats: &Stats, dir: &Path, animation: bool, debug: bool) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let renderer = CardRenderer::new()?;
    let year = chrono::Utc::now().year();
    let mut files = vec![
        (OVERVIEW_FILE, renderer.overview(stats, animation, year)?),
        (LANGUAGES_FILE, renderer.languages(stats, animation)?),
    ];
    if debug {
        files.push((DATA_FILE, generate_json_report(stats)?));
    }

    let mut written = Vec::with_capacity(files.len());
    for (name, content) in files {
        let path = dir.join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}
