//! Configuration module for the toc scanner and tracker
//!
//! This module provides configuration structures for heading scanning,
//! visibility observation, and the ignore filtering used when walking a site.

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid glob pattern: {0}")]
    InvalidGlob(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid root margin: {0}")]
    InvalidMargin(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Configuration for heading scanning and site walking
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Root directory to scan
    pub root: PathBuf,

    /// Tag of the content container (None = whole document)
    pub content_tag: Option<String>,

    /// Tag of major headings
    pub major_tag: String,

    /// Tag of minor headings
    pub minor_tag: String,

    /// Generate ids for headings that have none
    pub assign_missing_ids: bool,

    /// Custom ignore patterns
    pub ignore_patterns: Vec<String>,

    /// Number of threads for parallel processing
    pub threads: usize,

    /// Maximum page size to process (bytes)
    pub max_file_size: usize,

    /// Whether to follow symlinks
    pub follow_symlinks: bool,

    /// Whether to include hidden files
    pub include_hidden: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            content_tag: Some("main".to_string()),
            major_tag: "h2".to_string(),
            minor_tag: "h3".to_string(),
            assign_missing_ids: false,
            ignore_patterns: Vec::new(),
            threads: num_cpus(),
            max_file_size: 10 * 1024 * 1024, // 10 MB
            follow_symlinks: false,
            include_hidden: false,
        }
    }
}

impl ScanConfig {
    /// Create new config with root directory
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            ..Default::default()
        }
    }

    /// Set content container tag (builder pattern)
    pub fn with_content_tag(mut self, tag: Option<String>) -> Self {
        self.content_tag = tag.map(|t| t.to_ascii_lowercase());
        self
    }

    /// Set heading tags (builder pattern)
    pub fn with_heading_tags(mut self, major: &str, minor: &str) -> Self {
        self.major_tag = major.to_ascii_lowercase();
        self.minor_tag = minor.to_ascii_lowercase();
        self
    }

    /// Enable id generation for headings without one (builder pattern)
    pub fn with_assign_missing_ids(mut self, assign: bool) -> Self {
        self.assign_missing_ids = assign;
        self
    }

    /// Set ignore patterns (builder pattern)
    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    /// Set number of threads (builder pattern)
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set max file size (builder pattern)
    pub fn with_max_file_size(mut self, size: usize) -> Self {
        self.max_file_size = size;
        self
    }

    /// Set follow symlinks (builder pattern)
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Set include hidden files (builder pattern)
    pub fn with_include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Check the heading tags are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.major_tag.is_empty() || self.minor_tag.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "heading tags must not be empty".to_string(),
            ));
        }
        if self.major_tag == self.minor_tag {
            return Err(ConfigError::InvalidConfig(format!(
                "major and minor heading tags are both '{}'",
                self.major_tag
            )));
        }
        Ok(())
    }
}

/// Get number of available CPUs
fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
}

/// Margin that grows the observation window beyond the root's bounds, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RootMargin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl RootMargin {
    /// Same margin on every side
    pub fn uniform(px: f64) -> Self {
        Self {
            top: px,
            right: px,
            bottom: px,
            left: px,
        }
    }

    /// Parse CSS margin shorthand made of one to four pixel lengths
    ///
    /// `"500px"`, `"10px 20px"`, `"10px 20px 30px"` and `"1px 2px 3px 4px"`
    /// follow the usual top/right/bottom/left expansion. A bare `0` is allowed.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let values = input
            .split_whitespace()
            .map(parse_px)
            .collect::<Result<Vec<_>, _>>()?;

        match values.as_slice() {
            [all] => Ok(Self::uniform(*all)),
            [vertical, horizontal] => Ok(Self {
                top: *vertical,
                right: *horizontal,
                bottom: *vertical,
                left: *horizontal,
            }),
            [top, horizontal, bottom] => Ok(Self {
                top: *top,
                right: *horizontal,
                bottom: *bottom,
                left: *horizontal,
            }),
            [top, right, bottom, left] => Ok(Self {
                top: *top,
                right: *right,
                bottom: *bottom,
                left: *left,
            }),
            _ => Err(ConfigError::InvalidMargin(input.to_string())),
        }
    }
}

impl Default for RootMargin {
    fn default() -> Self {
        Self::uniform(DEFAULT_ROOT_MARGIN_PX)
    }
}

fn parse_px(token: &str) -> Result<f64, ConfigError> {
    if token == "0" {
        return Ok(0.0);
    }
    token
        .strip_suffix("px")
        .and_then(|n| n.parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .ok_or_else(|| ConfigError::InvalidMargin(token.to_string()))
}

/// Default margin around the observation root
pub const DEFAULT_ROOT_MARGIN_PX: f64 = 500.0;

/// Default observation root selector
pub const DEFAULT_ROOT_SELECTOR: &str = "iframe";

/// Options handed to a visibility observer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObserverOptions {
    /// Selector of the scrollable root (None = viewport)
    pub root: Option<String>,

    /// Margin expanding the detection window
    pub root_margin: RootMargin,
}

impl Default for ObserverOptions {
    fn default() -> Self {
        Self {
            root: Some(DEFAULT_ROOT_SELECTOR.to_string()),
            root_margin: RootMargin::default(),
        }
    }
}

impl ObserverOptions {
    /// Observe against the viewport
    pub fn viewport() -> Self {
        Self {
            root: None,
            ..Default::default()
        }
    }

    /// Set root selector (builder pattern)
    pub fn with_root(mut self, root: Option<String>) -> Self {
        self.root = root;
        self
    }

    /// Set root margin (builder pattern)
    pub fn with_root_margin(mut self, margin: RootMargin) -> Self {
        self.root_margin = margin;
        self
    }
}

/// Filter for ignoring files and directories
pub struct IgnoreFilter {
    /// Gitignore rules
    gitignore: Option<Gitignore>,

    /// Custom glob patterns
    custom_globs: GlobSet,

    /// Default ignore patterns
    default_ignores: GlobSet,

    /// Whether to include hidden files
    include_hidden: bool,
}

impl IgnoreFilter {
    /// Create a new ignore filter from config
    pub fn new(config: &ScanConfig) -> Result<Self, ConfigError> {
        let gitignore = Self::build_gitignore(&config.root)?;
        let custom_globs = Self::build_globset(&config.ignore_patterns)?;

        let default_patterns = [
            "**/node_modules/**",
            "**/.git/**",
            "**/.next/**",
            "**/.nuxt/**",
            "**/.cache/**",
            "**/coverage/**",
            "**/target/**",
            "**/vendor/**",
        ];
        let default_ignores = Self::build_globset(
            &default_patterns.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        )?;

        Ok(Self {
            gitignore,
            custom_globs,
            default_ignores,
            include_hidden: config.include_hidden,
        })
    }

    /// Build gitignore from root directory
    fn build_gitignore(root: &Path) -> Result<Option<Gitignore>, ConfigError> {
        let gitignore_path = root.join(".gitignore");
        if !gitignore_path.exists() {
            return Ok(None);
        }

        let mut builder = GitignoreBuilder::new(root);
        if let Some(err) = builder.add(&gitignore_path) {
            tracing::debug!(error = %err, "Ignoring unreadable .gitignore");
            return Ok(None);
        }

        match builder.build() {
            Ok(gi) => Ok(Some(gi)),
            Err(_) => Ok(None),
        }
    }

    /// Build a globset from patterns
    fn build_globset(patterns: &[String]) -> Result<GlobSet, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| ConfigError::InvalidGlob(e.to_string()))?;
            builder.add(glob);
        }
        builder
            .build()
            .map_err(|e| ConfigError::InvalidGlob(e.to_string()))
    }

    /// Check if a path should be ignored
    pub fn should_ignore(&self, path: &Path, is_dir: bool) -> bool {
        let path_str = path.to_string_lossy();

        if !self.include_hidden {
            if let Some(name) = path.file_name() {
                if name.to_string_lossy().starts_with('.') {
                    return true;
                }
            }
        }

        if self.default_ignores.is_match(&*path_str) || self.custom_globs.is_match(&*path_str) {
            return true;
        }

        if let Some(ref gi) = self.gitignore {
            if gi.matched(path, is_dir).is_ignore() {
                return true;
            }
        }

        false
    }

    /// Check if path is a rendered page
    pub fn is_page(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| {
                let ext = ext.to_string_lossy().to_ascii_lowercase();
                ext == "html" || ext == "htm"
            })
            .unwrap_or(false)
    }
}
