//! Keyword extraction and word clouds for noisy Chinese news and forum text.
//!
//! [`KeywordPipeline`] runs raw text through the [`TextCleaner`], segments it
//! with a [`Segmenter`] (Jieba by default), drops stopwords, optionally keeps
//! only content-bearing parts of speech, and counts what is left. The counts
//! feed either a ranked keyword list or an SVG word cloud.
//!
//! ```no_run
//! use jieba_wordcloud_rs::KeywordPipeline;
//!
//! let pipeline = KeywordPipeline::new();
//! let keywords = pipeline.keywords("颱風明天登陸，颱風警報持續發布。")?;
//! let counts = pipeline.word_counts("颱風明天登陸，颱風警報持續發布。")?;
//! let svg = pipeline.render_word_cloud(&counts)?;
//! # Ok::<(), jieba_wordcloud_rs::Error>(())
//! ```

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;

pub mod backend;
pub mod cleaner;
pub mod config;
pub mod dictionary_lib;
pub mod error;
pub mod frequency;
pub mod wordcloud;

pub use backend::{JiebaBackend, PosTagger, Segmenter};
pub use cleaner::{CleanRule, RuleScope, RuleSpec, TextCleaner};
pub use config::{PipelineConfig, CTB_ACCEPTED_TAGS, DEFAULT_ACCEPTED_TAGS};
pub use dictionary_lib::StopwordSet;
pub use error::{Error, Result};
pub use frequency::{count, top_k, top_k_with_counts, FrequencyMap, DEFAULT_TOP_K};
pub use wordcloud::{RenderOptions, WordCloudRenderer};

static FLOOR_MARKER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[^A-Za-z0-9])B\d+(?:-\d+)?").unwrap());

enum StopwordSource {
    Dir(PathBuf),
    Paths(Vec<PathBuf>),
}

/// End-to-end keyword pipeline.
///
/// The stopword set and the backend dictionaries are loaded on first use and
/// then reused for the lifetime of the pipeline. Nothing is mutated after that,
/// so one pipeline can serve many threads.
pub struct KeywordPipeline {
    cleaner: TextCleaner,
    segmenter: Arc<dyn Segmenter>,
    tagger: Arc<dyn PosTagger>,
    stopword_source: StopwordSource,
    stopwords: OnceCell<StopwordSet>,
    accepted_tags: Option<HashSet<String>>,
    top_k: usize,
    renderer: WordCloudRenderer,
}

impl Default for KeywordPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordPipeline {
    /// Pipeline with the default configuration: built-in cleaning rules, Jieba,
    /// stopwords from `./stopwords`, no part-of-speech filter.
    pub fn new() -> Self {
        let config = PipelineConfig::default();
        let backend = Arc::new(JiebaBackend::new());
        KeywordPipeline {
            cleaner: TextCleaner::new(),
            segmenter: backend.clone(),
            tagger: backend,
            stopword_source: StopwordSource::Dir(config.stopword_dir),
            stopwords: OnceCell::new(),
            accepted_tags: None,
            top_k: config.top_k,
            renderer: WordCloudRenderer::with_options(config.font_path, config.render),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;

        let mut cleaner = TextCleaner::new();
        for spec in &config.extra_rules {
            cleaner.push_rule(CleanRule::from_spec(spec)?);
        }

        let mut backend = JiebaBackend::new().with_hmm(config.hmm);
        if let Some(path) = &config.user_dict {
            backend = backend.with_user_dict(path.clone());
        }
        let backend = Arc::new(backend);

        let stopword_source = if config.stopword_paths.is_empty() {
            StopwordSource::Dir(config.stopword_dir.clone())
        } else {
            StopwordSource::Paths(config.stopword_paths.clone())
        };
        let accepted_tags = config
            .pos_filter
            .then(|| config.accepted_tags.iter().cloned().collect());

        info!(
            "keyword pipeline: {} cleaning rules, top_k {}, pos filter {}",
            cleaner.rules().len(),
            config.top_k,
            config.pos_filter
        );

        Ok(KeywordPipeline {
            cleaner,
            segmenter: backend.clone(),
            tagger: backend,
            stopword_source,
            stopwords: OnceCell::new(),
            accepted_tags,
            top_k: config.top_k,
            renderer: WordCloudRenderer::with_options(
                config.font_path.clone(),
                config.render.clone(),
            ),
        })
    }

    /// Replaces the segmentation and tagging backends.
    pub fn with_backend(
        mut self,
        segmenter: Arc<dyn Segmenter>,
        tagger: Arc<dyn PosTagger>,
    ) -> Self {
        self.segmenter = segmenter;
        self.tagger = tagger;
        self
    }

    /// Uses `stopwords` as-is instead of loading lists from disk.
    pub fn with_stopwords(self, stopwords: StopwordSet) -> Self {
        KeywordPipeline {
            stopwords: OnceCell::with_value(stopwords),
            ..self
        }
    }

    /// Enables the part-of-speech filter with the given accepted tags.
    pub fn with_pos_filter<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accepted_tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn without_pos_filter(mut self) -> Self {
        self.accepted_tags = None;
        self
    }

    pub fn with_cleaner(mut self, cleaner: TextCleaner) -> Self {
        self.cleaner = cleaner;
        self
    }

    pub fn with_renderer(mut self, renderer: WordCloudRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn cleaner(&self) -> &TextCleaner {
        &self.cleaner
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Normalizes raw text; never fails.
    pub fn clean(&self, text: &str) -> String {
        self.cleaner.clean(text)
    }

    /// The stopword set, loaded on first call.
    pub fn stopwords(&self) -> Result<&StopwordSet> {
        self.stopwords.get_or_try_init(|| match &self.stopword_source {
            StopwordSource::Dir(dir) => {
                info!("loading stopwords from {}", dir.display());
                StopwordSet::load_dir(dir)
            }
            StopwordSource::Paths(paths) => StopwordSet::load(paths.as_slice()),
        })
    }

    /// Clean, segment, drop stopwords and, if enabled, keep only accepted
    /// parts of speech. Token order is preserved throughout.
    pub fn segment_and_filter(&self, text: &str) -> Result<Vec<String>> {
        let stopwords = self.stopwords()?;
        let normalized = self.cleaner.clean(text);
        if normalized.is_empty() {
            return Ok(Vec::new());
        }

        let tokens = self.segmenter.segment(&normalized)?;
        let segmented = tokens.len();
        let tokens: Vec<String> = tokens
            .into_iter()
            .filter(|token| !token.is_empty() && !stopwords.contains(token))
            .collect();
        debug!(
            "{} tokens segmented, {} left after stopwords",
            segmented,
            tokens.len()
        );

        match &self.accepted_tags {
            Some(accepted) => {
                let kept = filter_by_pos(self.tagger.as_ref(), tokens, accepted)?;
                debug!("{} tokens left after part-of-speech filter", kept.len());
                Ok(kept)
            }
            None => Ok(tokens),
        }
    }

    pub fn word_counts(&self, text: &str) -> Result<FrequencyMap> {
        Ok(count(self.segment_and_filter(text)?))
    }

    /// The configured number of top keywords in `text`.
    pub fn keywords(&self, text: &str) -> Result<Vec<String>> {
        self.keywords_with_k(text, self.top_k)
    }

    pub fn keywords_with_k(&self, text: &str, k: usize) -> Result<Vec<String>> {
        Ok(top_k(&self.word_counts(text)?, k))
    }

    pub fn render_word_cloud(&self, freq: &FrequencyMap) -> Result<String> {
        self.renderer.render(freq)
    }

    /// Word cloud of `text`. Text with nothing left after filtering is an
    /// [`Error::EmptyFrequencies`].
    pub fn word_cloud(&self, text: &str) -> Result<String> {
        self.render_word_cloud(&self.word_counts(text)?)
    }
}

/// Tags `tokens` and keeps those whose tag is in `accepted`, in order.
pub fn filter_by_pos(
    tagger: &dyn PosTagger,
    tokens: Vec<String>,
    accepted: &HashSet<String>,
) -> Result<Vec<String>> {
    let tags = tagger.tag(&tokens)?;
    if tags.len() != tokens.len() {
        return Err(Error::TagMismatch {
            tokens: tokens.len(),
            tags: tags.len(),
        });
    }
    Ok(tokens
        .into_iter()
        .zip(tags)
        .filter(|(_, tag)| accepted.contains(tag))
        .map(|(token, _)| token)
        .collect())
}

/// Joins comment or reply bodies with single spaces, the way a page of
/// comments is fed to the pipeline.
pub fn join_texts<I, S>(texts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    texts
        .into_iter()
        .map(|text| text.as_ref().to_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Removes forum floor markers such as `B12` or `B12-3` that reply threads
/// carry in their text.
pub fn strip_floor_markers(text: &str) -> String {
    FLOOR_MARKER_REGEX.replace_all(text, "$1").into_owned()
}
