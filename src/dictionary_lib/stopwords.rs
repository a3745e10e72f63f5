//! Stopword sets aggregated from word-list files.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use log::info;
use walkdir::WalkDir;

use super::{has_extension, parse_word_list, read_dictionary_text, save_compressed, ListFormat};
use crate::error::{Error, Result};

/// Punctuation and whitespace that never carry meaning on their own. Every
/// character here is a stopword in a loaded set.
pub const PUNCTUATION_AND_WHITESPACE: &str = " \t\n\r\u{000B}\u{000C}!\"#$%&'()*+,-./:;<=>?@[\\]^_`{}|~＝、。“”‘’『』「」﹁﹂—－（）《》〈〉？！…／＼︒︑︔︓︿﹀︹︺︙︐［﹇］﹈︕︖︰︳︴︽︾︵︶｛︷｝︸﹃﹄【︻】︼　～．，；：·‧•";

const LIST_EXTENSIONS: [&str; 3] = ["json", "txt", "zst"];

/// Immutable set of tokens excluded from frequency analysis. Membership is an
/// exact, case-sensitive string match.
#[derive(Debug, Clone, Default)]
pub struct StopwordSet {
    words: HashSet<String>,
}

impl StopwordSet {
    /// Unions every word in every file with the punctuation and whitespace
    /// characters. Any unreadable or malformed file fails the whole load.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut words: HashSet<String> = PUNCTUATION_AND_WHITESPACE
            .chars()
            .map(String::from)
            .collect();

        for path in paths {
            let path = path.as_ref();
            let list = read_word_list(path)?;
            info!("loaded {} stopwords from {}", list.len(), path.display());
            words.extend(list);
        }

        Ok(StopwordSet { words })
    }

    /// Loads every `.json`, `.txt` and `.zst` list directly inside `dir`, in
    /// file-name order.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Error::stopwords(dir, "not a readable directory"));
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| Error::stopwords(dir, e))?;
            if entry.file_type().is_file() && is_list_file(entry.path()) {
                paths.push(entry.into_path());
            }
        }
        Self::load(paths.as_slice())
    }

    /// Builds a set from the given words only, without the punctuation
    /// characters.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StopwordSet {
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }

    /// Writes the set as one merged, sorted list. The format follows the file
    /// name the same way [`load`](Self::load) reads it, so `stopwords.json.zst`
    /// is a compressed JSON array. Whitespace entries are left out of
    /// line-based lists; loading adds them back.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut words: Vec<&str> = self.iter().collect();
        words.sort_unstable();

        let content = match ListFormat::from_path(path) {
            ListFormat::Json => serde_json::to_string(&words)?,
            ListFormat::Lines => {
                let mut lines = words
                    .into_iter()
                    .filter(|word| !word.trim().is_empty())
                    .collect::<Vec<_>>()
                    .join("\n");
                lines.push('\n');
                lines
            }
        };

        if has_extension(path, "zst") {
            save_compressed(&content, path)?;
        } else {
            fs::write(path, content)?;
        }
        info!("saved {} stopwords to {}", self.len(), path.display());
        Ok(())
    }
}

fn read_word_list(path: &Path) -> Result<Vec<String>> {
    let content = read_dictionary_text(path).map_err(|e| Error::stopwords(path, e))?;
    parse_word_list(&content, ListFormat::from_path(path)).map_err(|e| Error::stopwords(path, e))
}

fn is_list_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| {
            LIST_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_unions_files_and_punctuation() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("zh.json");
        let txt = dir.path().join("extra.txt");
        fs::write(&json, r#"["的", "了", "是"]"#).unwrap();
        fs::write(&txt, "的\n我們\n").unwrap();

        let set = StopwordSet::load(&[&json, &txt]).unwrap();
        for word in ["的", "了", "是", "我們", "，", "。", " ", "\n", "　"] {
            assert!(set.contains(word), "missing {word:?}");
        }
        assert!(!set.contains("台灣"));
    }

    #[test]
    fn load_fails_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        match StopwordSet::load(&[&missing]) {
            Err(Error::Stopwords { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected stopword error, got {other:?}"),
        }
    }

    #[test]
    fn load_fails_on_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            StopwordSet::load(&[&path]),
            Err(Error::Stopwords { .. })
        ));
    }

    #[test]
    fn load_dir_picks_list_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.json"), r#"["因為"]"#).unwrap();
        fs::write(dir.path().join("b.txt"), "所以\n").unwrap();
        fs::write(dir.path().join("notes.md"), "不是停用詞\n").unwrap();

        let set = StopwordSet::load_dir(dir.path()).unwrap();
        assert!(set.contains("因為"));
        assert!(set.contains("所以"));
        assert!(!set.contains("不是停用詞"));
    }

    #[test]
    fn load_dir_fails_on_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(StopwordSet::load_dir(dir.path().join("nope")).is_err());
    }

    #[test]
    fn saved_set_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.json"), r#"["因為", "所以"]"#).unwrap();
        let set = StopwordSet::load_dir(dir.path()).unwrap();

        let out = tempfile::tempdir().unwrap();
        for name in ["merged.json.zst", "merged.txt"] {
            let path = out.path().join(name);
            set.save(&path).unwrap();
            let reloaded = StopwordSet::load(&[&path]).unwrap();
            assert_eq!(reloaded.len(), set.len(), "{name}");
            assert!(set.iter().all(|word| reloaded.contains(word)), "{name}");
        }

        let text = fs::read_to_string(out.path().join("merged.txt")).unwrap();
        assert!(text.lines().all(|line| !line.trim().is_empty()));
    }

    #[test]
    fn membership_is_case_sensitive() {
        let set = StopwordSet::from_words(["The"]);
        assert!(set.contains("The"));
        assert!(!set.contains("the"));
        assert_eq!(set.len(), 1);
    }
}
