//! Pipeline configuration.
//!
//! Everything has a default matching the layout the dashboard ships with
//! (`./stopwords/*.json`, `./fonts/arial-unicode.ttf`, five keywords), so an
//! empty JSON object is a valid configuration:
//!
//! ```
//! use jieba_wordcloud_rs::config::PipelineConfig;
//!
//! let config: PipelineConfig = serde_json::from_str(r#"{ "top_k": 10, "pos_filter": true }"#).unwrap();
//! assert_eq!(config.top_k, 10);
//! assert_eq!(config.render.width, 1024);
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cleaner::RuleSpec;
use crate::error::{Error, Result};
use crate::frequency::DEFAULT_TOP_K;
use crate::wordcloud::RenderOptions;

/// Tags kept by the part-of-speech filter with the Jieba backend: numerals,
/// foreign words, adjectives, nouns (common, person, place, organization,
/// other proper, work titles), time words and verbs.
pub const DEFAULT_ACCEPTED_TAGS: [&str; 14] = [
    "m", "eng", "a", "an", "ad", "n", "nr", "ns", "nt", "nz", "nw", "t", "v", "vn",
];

/// The same content-bearing categories in Penn Chinese Treebank tags, for
/// taggers that emit CTB labels.
pub const CTB_ACCEPTED_TAGS: [&str; 9] = ["CD", "FW", "JJ", "NN", "NR", "NT", "OD", "VA", "VV"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory scanned for stopword lists when `stopword_paths` is empty.
    pub stopword_dir: PathBuf,
    /// Explicit stopword list files; takes precedence over `stopword_dir`.
    pub stopword_paths: Vec<PathBuf>,
    pub font_path: PathBuf,
    pub top_k: usize,
    pub pos_filter: bool,
    pub accepted_tags: Vec<String>,
    /// Let Jieba's HMM discover words missing from the dictionary.
    pub hmm: bool,
    pub user_dict: Option<PathBuf>,
    /// Cleaning rules appended after the built-in ones.
    pub extra_rules: Vec<RuleSpec>,
    pub render: RenderOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            stopword_dir: PathBuf::from("./stopwords"),
            stopword_paths: Vec::new(),
            font_path: PathBuf::from("./fonts/arial-unicode.ttf"),
            top_k: DEFAULT_TOP_K,
            pos_filter: false,
            accepted_tags: DEFAULT_ACCEPTED_TAGS.iter().map(|t| t.to_string()).collect(),
            hmm: true,
            user_dict: None,
            extra_rules: Vec::new(),
            render: RenderOptions::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pos_filter && self.accepted_tags.is_empty() {
            return Err(Error::config(
                "pos_filter is enabled but accepted_tags is empty",
            ));
        }
        if self.render.width == 0 || self.render.height == 0 {
            return Err(Error::config("render width and height must be positive"));
        }
        if !(0.0..=1.0).contains(&self.render.prefer_horizontal)
            || !(0.0..=1.0).contains(&self.render.relative_scaling)
        {
            return Err(Error::config(
                "prefer_horizontal and relative_scaling must be within 0..=1",
            ));
        }
        let render = &self.render;
        let max_font_size = render.max_font_size.unwrap_or(f64::from(render.height) / 4.0);
        if !(render.min_font_size > 0.0 && render.font_step > 0.0 && max_font_size > 0.0) {
            return Err(Error::config(
                "min_font_size, max_font_size and font_step must be positive",
            ));
        }
        if max_font_size < render.min_font_size || max_font_size > f64::from(render.height) {
            return Err(Error::config(
                "max_font_size must lie between min_font_size and the canvas height",
            ));
        }
        Ok(())
    }
}
