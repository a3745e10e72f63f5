//! Segmentation and part-of-speech tagging backends.
//!
//! The pipeline only depends on the [`Segmenter`] and [`PosTagger`] traits, so
//! any dictionary, statistical or remote backend can stand in as long as it
//! keeps token order and returns exactly one tag per token.

use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use jieba_rs::Jieba;
use log::{debug, info};
use once_cell::sync::OnceCell;
use rayon::prelude::*;

use crate::dictionary_lib::read_dictionary_text;
use crate::dictionary_lib::stopwords::PUNCTUATION_AND_WHITESPACE;
use crate::error::{Error, Result};

// Inputs at least this many bytes long are cut chunk-by-chunk in parallel.
const PARALLEL_THRESHOLD: usize = 500;

/// Splits continuous text into ordered word tokens.
pub trait Segmenter: Send + Sync {
    fn segment(&self, text: &str) -> Result<Vec<String>>;
}

/// Assigns one part-of-speech tag to each token, in order.
pub trait PosTagger: Send + Sync {
    fn tag(&self, tokens: &[String]) -> Result<Vec<String>>;
}

/// Jieba-backed segmenter and tagger.
///
/// The dictionary is loaded on first use and shared by every later call; clone
/// the backend (cheap) or wrap it in an `Arc` to share it between pipelines.
#[derive(Clone)]
pub struct JiebaBackend {
    jieba: Arc<OnceCell<Jieba>>,
    user_dict: Option<PathBuf>,
    hmm: bool,
}

impl Default for JiebaBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl JiebaBackend {
    /// Backend using Jieba's bundled dictionary, with HMM discovery of unknown
    /// words enabled.
    pub fn new() -> Self {
        JiebaBackend {
            jieba: Arc::new(OnceCell::new()),
            user_dict: None,
            hmm: true,
        }
    }

    /// Loads an additional user dictionary (Jieba `word [freq] [tag]` lines,
    /// optionally zstd-compressed) on top of the bundled one.
    pub fn with_user_dict<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.user_dict = Some(path.into());
        self
    }

    pub fn with_hmm(mut self, hmm: bool) -> Self {
        self.hmm = hmm;
        self
    }

    /// Returns the underlying Jieba instance, loading it if needed.
    pub fn jieba(&self) -> Result<&Jieba> {
        self.jieba.get_or_try_init(|| {
            let mut jieba = Jieba::new();
            if let Some(path) = &self.user_dict {
                let content = read_dictionary_text(path).map_err(|e| {
                    Error::backend(format!("user dictionary {}: {e}", path.display()))
                })?;
                jieba
                    .load_dict(&mut BufReader::new(content.as_bytes()))
                    .map_err(|e| {
                        Error::backend(format!("user dictionary {}: {e}", path.display()))
                    })?;
                info!("loaded user dictionary {}", path.display());
            }
            info!("jieba dictionary ready");
            Ok(jieba)
        })
    }

    fn cut_chunk(jieba: &Jieba, chunk: &str, hmm: bool) -> Vec<String> {
        jieba
            .cut(chunk, hmm)
            .into_iter()
            .filter(|word| !word.trim().is_empty())
            .map(str::to_owned)
            .collect()
    }

    fn tag_token(jieba: &Jieba, token: &str, hmm: bool) -> String {
        // A token jieba would split again takes the tag of its last piece;
        // Chinese compounds are head-final.
        jieba
            .tag(token, hmm)
            .last()
            .map(|tag| tag.tag.to_owned())
            .unwrap_or_else(|| "x".to_owned())
    }
}

impl Segmenter for JiebaBackend {
    fn segment(&self, text: &str) -> Result<Vec<String>> {
        let jieba = self.jieba()?;
        let use_parallel = text.len() >= PARALLEL_THRESHOLD;
        let chunks = split_string_inclusive(text);
        debug!(
            "segmenting {} chunk(s), parallel: {}",
            chunks.len(),
            use_parallel
        );

        let tokens: Vec<String> = if use_parallel {
            chunks
                .par_iter()
                .flat_map_iter(|chunk| Self::cut_chunk(jieba, chunk, self.hmm))
                .collect()
        } else {
            chunks
                .iter()
                .flat_map(|chunk| Self::cut_chunk(jieba, chunk, self.hmm))
                .collect()
        };
        Ok(tokens)
    }
}

impl PosTagger for JiebaBackend {
    fn tag(&self, tokens: &[String]) -> Result<Vec<String>> {
        let jieba = self.jieba()?;
        let tags: Vec<String> = if tokens.len() >= PARALLEL_THRESHOLD {
            tokens
                .par_iter()
                .map(|token| Self::tag_token(jieba, token, self.hmm))
                .collect()
        } else {
            tokens
                .iter()
                .map(|token| Self::tag_token(jieba, token, self.hmm))
                .collect()
        };
        Ok(tags)
    }
}

/// Splits `text` after every punctuation or whitespace character, keeping the
/// delimiter at the end of its chunk. Concatenating the chunks gives back the
/// input.
pub fn split_string_inclusive(text: &str) -> Vec<&str> {
    text.split_inclusive(|ch: char| PUNCTUATION_AND_WHITESPACE.contains(ch))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_keeps_delimiters() {
        assert_eq!(split_string_inclusive("你好，世界！"), vec!["你好，", "世界！"]);
        assert_eq!(
            split_string_inclusive("Hello,World!Rust"),
            vec!["Hello,", "World!", "Rust"]
        );
        assert_eq!(split_string_inclusive("，Hello"), vec!["，", "Hello"]);
        assert!(split_string_inclusive("").is_empty());
    }

    #[test]
    fn jieba_segments_in_order() {
        let backend = JiebaBackend::new();
        let tokens = backend.segment("我們中出了一個叛徒").unwrap();
        assert_eq!(tokens.concat(), "我們中出了一個叛徒");
        assert!(tokens.iter().all(|t| !t.trim().is_empty()));
    }

    #[test]
    fn jieba_drops_whitespace_tokens() {
        let backend = JiebaBackend::new();
        let tokens = backend.segment("台北 天氣\n很好").unwrap();
        assert_eq!(tokens.concat(), "台北天氣很好");
    }

    #[test]
    fn parallel_and_sequential_segmentation_agree() {
        let backend = JiebaBackend::new();
        let sentence = "今天台北的天氣很好，我們一起去公園散步。";
        let long_text = sentence.repeat(40);
        assert!(long_text.len() >= PARALLEL_THRESHOLD);

        let short_tokens = backend.segment(sentence).unwrap();
        let long_tokens = backend.segment(&long_text).unwrap();
        assert_eq!(long_tokens.len(), short_tokens.len() * 40);
        assert_eq!(&long_tokens[..short_tokens.len()], &short_tokens[..]);
    }

    #[test]
    fn jieba_tags_one_per_token() {
        let backend = JiebaBackend::new();
        let tokens: Vec<String> = ["天氣", "很", "好", "2024", "我們中出"]
            .into_iter()
            .map(String::from)
            .collect();
        let tags = backend.tag(&tokens).unwrap();
        assert_eq!(tags.len(), tokens.len());
        assert!(tags.iter().all(|tag| !tag.is_empty()));
    }

    #[test]
    fn missing_user_dict_is_backend_error() {
        let backend = JiebaBackend::new().with_user_dict("/nonexistent/user.dict");
        assert!(matches!(backend.segment("測試"), Err(Error::Backend(_))));
    }
}
