//! Word-cloud rendering to self-contained SVG.
//!
//! Layout follows the usual word-cloud recipe: words are taken by descending
//! frequency, sized relative to the previous word, and dropped at random free
//! spots on the canvas, stepping the font size down until they fit. The random
//! source is seeded, so a given frequency map always yields the same image.
//! The font is embedded as a base64 `@font-face`, so CJK glyphs render the same
//! in every viewer.

use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use log::{debug, warn};
use once_cell::sync::OnceCell;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::frequency::FrequencyMap;

// Random spots tried per size/orientation before giving up on it.
const PLACEMENT_ATTEMPTS: usize = 300;
// Share of the font size above the baseline.
const ASCENT: f64 = 0.88;

const PALETTE: [&str; 10] = [
    "#440154", "#482878", "#3e4989", "#31688e", "#26828e", "#1f9e89", "#35b779", "#6ece58",
    "#b5de2b", "#fde725",
];

/// Canvas and layout parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    pub seed: u64,
    pub max_words: usize,
    pub min_font_size: f64,
    /// Size of the most frequent word; a quarter of the canvas height if unset.
    pub max_font_size: Option<f64>,
    pub font_step: f64,
    pub prefer_horizontal: f64,
    pub relative_scaling: f64,
    pub margin: f64,
    pub background: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            width: 1024,
            height: 768,
            seed: 42,
            max_words: 200,
            min_font_size: 4.0,
            max_font_size: None,
            font_step: 1.0,
            prefer_horizontal: 0.9,
            relative_scaling: 0.5,
            margin: 2.0,
            background: "black".to_owned(),
        }
    }
}

/// One word as laid out on the canvas. `(x, y)` is the top-left corner of its
/// bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedWord {
    pub text: String,
    pub count: usize,
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
    pub vertical: bool,
    pub color: &'static str,
}

impl PlacedWord {
    /// Bounding box width and height.
    pub fn extent(&self) -> (f64, f64) {
        measure(&self.text, self.font_size, self.vertical)
    }
}

/// Renders frequency maps into SVG using one font file.
pub struct WordCloudRenderer {
    font_path: PathBuf,
    options: RenderOptions,
    font_data: OnceCell<String>,
}

impl WordCloudRenderer {
    pub fn new<P: Into<PathBuf>>(font_path: P) -> Self {
        Self::with_options(font_path, RenderOptions::default())
    }

    pub fn with_options<P: Into<PathBuf>>(font_path: P, options: RenderOptions) -> Self {
        WordCloudRenderer {
            font_path: font_path.into(),
            options,
            font_data: OnceCell::new(),
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn font_path(&self) -> &Path {
        &self.font_path
    }

    /// Places words on the canvas. Fails with [`Error::EmptyFrequencies`] when
    /// no word has a positive count.
    pub fn layout(&self, freq: &FrequencyMap) -> Result<Vec<PlacedWord>> {
        let opts = &self.options;
        let words: Vec<(&str, usize)> = freq
            .ranked()
            .into_iter()
            .filter(|&(_, n)| n > 0)
            .take(opts.max_words)
            .collect();
        let (first_word, max_count) = match words.first() {
            Some(&(word, n)) => (word.to_owned(), n as f64),
            None => return Err(Error::EmptyFrequencies),
        };
        if opts.width == 0 || opts.height == 0 {
            return Err(Error::config("canvas width and height must be positive"));
        }

        let width = f64::from(opts.width);
        let height = f64::from(opts.height);
        let mut rng = StdRng::seed_from_u64(opts.seed);
        let mut placed: Vec<PlacedWord> = Vec::with_capacity(words.len());
        let mut font_size = opts.max_font_size.unwrap_or(height / 4.0);
        let mut last_rel = 1.0;

        for (i, (word, count)) in words.into_iter().enumerate() {
            let rel = count as f64 / max_count;
            if i > 0 && opts.relative_scaling != 0.0 {
                font_size = ((opts.relative_scaling * rel / last_rel
                    + (1.0 - opts.relative_scaling))
                    * font_size)
                    .round();
            }

            let mut vertical = rng.random::<f64>() >= opts.prefer_horizontal;
            let mut tried_other_orientation = false;
            let position = loop {
                if font_size < opts.min_font_size {
                    break None;
                }
                let (w, h) = measure(word, font_size, vertical);
                if let Some(pos) = find_spot(&mut rng, w, h, width, height, opts.margin, &placed)
                {
                    break Some(pos);
                }
                if !tried_other_orientation && opts.prefer_horizontal < 1.0 {
                    vertical = !vertical;
                    tried_other_orientation = true;
                } else {
                    font_size -= opts.font_step.max(0.5);
                }
            };

            let Some((x, y)) = position else {
                warn!(
                    "canvas full after {} of {} words; dropping the rest",
                    placed.len(),
                    freq.len()
                );
                break;
            };

            let color = PALETTE[rng.random_range(0..PALETTE.len())];
            placed.push(PlacedWord {
                text: word.to_owned(),
                count,
                x,
                y,
                font_size,
                vertical,
                color,
            });
            last_rel = rel;
        }

        if placed.is_empty() {
            return Err(Error::CanvasTooSmall {
                word: first_word,
                width: opts.width,
                height: opts.height,
            });
        }
        debug!("laid out {} word(s)", placed.len());
        Ok(placed)
    }

    /// Renders `freq` to an SVG document with the font embedded.
    pub fn render(&self, freq: &FrequencyMap) -> Result<String> {
        let words = self.layout(freq)?;
        let font_data = self.font_data()?;
        let opts = &self.options;
        let family = font_family(&self.font_path);
        let (mime, format) = font_format(&self.font_path);

        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = opts.width,
            h = opts.height
        );
        svg.push_str(&format!(
            "<defs><style>@font-face{{font-family:'{family}';src:url(data:{mime};base64,{font_data}) format('{format}');}}text{{font-family:'{family}';}}</style></defs>"
        ));
        svg.push_str(&format!(
            r#"<rect width="100%" height="100%" style="fill:{}"/>"#,
            escape_xml(&opts.background)
        ));
        for word in &words {
            let (w, h) = word.extent();
            let transform = if word.vertical {
                format!(
                    "translate({:.1},{:.1}) rotate(-90)",
                    word.x + ASCENT * w,
                    word.y + h
                )
            } else {
                format!("translate({:.1},{:.1})", word.x, word.y + ASCENT * h)
            };
            svg.push_str(&format!(
                r#"<text transform="{transform}" font-size="{:.0}" style="fill:{}">{}</text>"#,
                word.font_size,
                word.color,
                escape_xml(&word.text)
            ));
        }
        svg.push_str("</svg>");

        Ok(svg)
    }

    fn font_data(&self) -> Result<&str> {
        self.font_data
            .get_or_try_init(|| {
                let bytes = fs::read(&self.font_path).map_err(|source| Error::Font {
                    path: self.font_path.clone(),
                    source,
                })?;
                debug!(
                    "embedding font {} ({} bytes)",
                    self.font_path.display(),
                    bytes.len()
                );
                Ok(STANDARD.encode(bytes))
            })
            .map(String::as_str)
    }
}

/// Approximate bounding box of `text` at `font_size`: full-width glyphs take a
/// square em, everything else about half of one.
fn measure(text: &str, font_size: f64, vertical: bool) -> (f64, f64) {
    let advance: f64 = text
        .chars()
        .map(|ch| if is_wide(ch) { 1.0 } else { 0.6 })
        .sum::<f64>()
        * font_size;
    if vertical {
        (font_size, advance)
    } else {
        (advance, font_size)
    }
}

fn is_wide(ch: char) -> bool {
    matches!(ch as u32,
        0x1100..=0x115F
        | 0x2E80..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6
        | 0x20000..=0x3FFFD)
}

fn find_spot(
    rng: &mut StdRng,
    w: f64,
    h: f64,
    width: f64,
    height: f64,
    margin: f64,
    placed: &[PlacedWord],
) -> Option<(f64, f64)> {
    if w > width || h > height {
        return None;
    }
    (0..PLACEMENT_ATTEMPTS)
        .map(|_| {
            (
                rng.random_range(0.0..=width - w),
                rng.random_range(0.0..=height - h),
            )
        })
        .find(|&(x, y)| {
            placed.iter().all(|other| {
                let (ow, oh) = other.extent();
                x + w + margin <= other.x
                    || other.x + ow + margin <= x
                    || y + h + margin <= other.y
                    || other.y + oh + margin <= y
            })
        })
}

fn font_family(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| {
            stem.chars()
                .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '-' || *ch == '_')
                .collect::<String>()
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "WordCloudFont".to_owned())
}

fn font_format(path: &Path) -> (&'static str, &'static str) {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("otf") => ("font/otf", "opentype"),
        Some("woff") => ("font/woff", "woff"),
        Some("woff2") => ("font/woff2", "woff2"),
        _ => ("font/ttf", "truetype"),
    }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::count;

    fn sample() -> FrequencyMap {
        [
            ("台灣", 12),
            ("選舉", 9),
            ("政府", 7),
            ("經濟", 5),
            ("AI", 5),
            ("颱風", 3),
            ("新聞", 2),
            ("民眾", 1),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn empty_map_is_rejected() {
        let renderer = WordCloudRenderer::new("/nonexistent/font.ttf");
        assert!(matches!(
            renderer.render(&FrequencyMap::new()),
            Err(Error::EmptyFrequencies)
        ));
        let zeros: FrequencyMap = [("零", 0)].into_iter().collect();
        assert!(matches!(renderer.layout(&zeros), Err(Error::EmptyFrequencies)));
    }

    #[test]
    fn layout_is_deterministic_and_in_bounds() {
        let renderer = WordCloudRenderer::new("unused.ttf");
        let first = renderer.layout(&sample()).unwrap();
        let second = renderer.layout(&sample()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 8);
        assert_eq!(first[0].text, "台灣");

        for word in &first {
            let (w, h) = word.extent();
            assert!(word.x >= 0.0 && word.y >= 0.0);
            assert!(word.x + w <= 1024.0 && word.y + h <= 768.0);
        }
    }

    #[test]
    fn placed_words_do_not_overlap() {
        let renderer = WordCloudRenderer::new("unused.ttf");
        let words = renderer.layout(&sample()).unwrap();
        for (i, a) in words.iter().enumerate() {
            for b in &words[i + 1..] {
                let (aw, ah) = a.extent();
                let (bw, bh) = b.extent();
                let apart = a.x + aw <= b.x || b.x + bw <= a.x || a.y + ah <= b.y || b.y + bh <= a.y;
                assert!(apart, "{} overlaps {}", a.text, b.text);
            }
        }
    }

    #[test]
    fn font_sizes_follow_frequency() {
        let renderer = WordCloudRenderer::new("unused.ttf");
        let words = renderer.layout(&count(["多", "多", "多", "多", "少"])).unwrap();
        assert!(words[0].font_size > words[1].font_size);
    }

    #[test]
    fn missing_font_is_reported() {
        let renderer = WordCloudRenderer::new("/nonexistent/font.ttf");
        assert!(matches!(renderer.render(&sample()), Err(Error::Font { .. })));
    }

    #[test]
    fn svg_embeds_font_and_escapes_words() {
        let dir = tempfile::tempdir().unwrap();
        let font = dir.path().join("arial-unicode.ttf");
        fs::write(&font, b"fake font bytes").unwrap();

        let renderer = WordCloudRenderer::new(&font);
        let freq: FrequencyMap = [("R&D", 2), ("<測試>", 1)].into_iter().collect();
        let svg = renderer.render(&freq).unwrap();

        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains(r#"width="1024" height="768""#));
        assert!(svg.contains(&STANDARD.encode(b"fake font bytes")));
        assert!(svg.contains("font-family:'arial-unicode'"));
        assert!(svg.contains("R&amp;D"));
        assert!(svg.contains("&lt;測試&gt;"));
    }

    #[test]
    fn word_too_large_for_canvas_is_an_error() {
        let renderer = WordCloudRenderer::new("/nonexistent/font.ttf");
        let freq: FrequencyMap = [("字".repeat(2000), 1)].into_iter().collect();
        match renderer.layout(&freq) {
            Err(Error::CanvasTooSmall { width, height, .. }) => {
                assert_eq!((width, height), (1024, 768));
            }
            other => panic!("unexpected layout: {other:?}"),
        }
        assert!(matches!(
            renderer.render(&freq),
            Err(Error::CanvasTooSmall { .. })
        ));
    }

    #[test]
    fn wide_glyphs_measure_wider() {
        let (cjk, _) = measure("測試", 10.0, false);
        let (ascii, _) = measure("ab", 10.0, false);
        assert!(cjk > ascii);
        assert_eq!(measure("測試", 10.0, true), (10.0, 20.0));
    }
}
