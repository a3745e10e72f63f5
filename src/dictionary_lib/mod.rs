use std::fs;
use std::io;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use zstd::stream::read::Decoder;
use zstd::Encoder;

pub mod stopwords;

pub use stopwords::StopwordSet;

/// Word-list formats understood by [`read_word_list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFormat {
    /// A JSON array of strings.
    Json,
    /// One entry per line; blank lines are skipped.
    Lines,
}

impl ListFormat {
    /// Picks the format from the file name, looking through a trailing `.zst`
    /// (`words.json.zst` is JSON).
    pub fn from_path(path: &Path) -> Self {
        let inner = if has_extension(path, "zst") {
            path.file_stem().map(Path::new).and_then(Path::extension)
        } else {
            path.extension()
        };
        match inner.and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ListFormat::Json,
            _ => ListFormat::Lines,
        }
    }
}

/// Reads a dictionary or word-list file as UTF-8 text, transparently
/// decompressing `.zst` files.
pub fn read_dictionary_text<P: AsRef<Path>>(path: P) -> io::Result<String> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    if has_extension(path, "zst") {
        decompress(&bytes)
    } else {
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

/// Parses word-list content in the given format.
pub fn parse_word_list(content: &str, format: ListFormat) -> serde_json::Result<Vec<String>> {
    match format {
        ListFormat::Json => serde_json::from_str(content),
        ListFormat::Lines => Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect()),
    }
}

/// Writes `content` zstd-compressed, for shipping large stopword lists or
/// user dictionaries alongside the binary.
pub fn save_compressed<P: AsRef<Path>>(content: &str, path: P) -> io::Result<()> {
    let file = fs::File::create(path)?;
    let mut encoder = Encoder::new(io::BufWriter::new(file), 19)?;
    encoder.write_all(content.as_bytes())?;
    encoder.finish()?.flush()?;
    Ok(())
}

fn decompress(bytes: &[u8]) -> io::Result<String> {
    let mut decoder = Decoder::new(Cursor::new(bytes))?;
    let mut decompressed = String::new();
    decoder.read_to_string(&mut decompressed)?;
    Ok(decompressed)
}

pub(crate) fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case(ext))
}
