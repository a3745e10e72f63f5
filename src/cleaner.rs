//! Rule-based noise removal for scraped news and forum text.
//!
//! A [`TextCleaner`] owns an ordered list of [`CleanRule`]s and folds the input
//! through them, then normalizes whitespace. The built-in list targets the
//! handful of sources the keyword pipeline is fed from (one news outlet's figure
//! captions, PTT footers, "related news" trailers, bylines). Further
//! source-specific rules are appended with [`TextCleaner::push_rule`] and always
//! run after the built-ins.
//!
//! ```
//! use jieba_wordcloud_rs::cleaner::TextCleaner;
//!
//! let cleaner = TextCleaner::new();
//! let text = "這是一個測試！！！ <b>bold</b> http://example.com";
//! assert_eq!(cleaner.clean(text), "這是一個測試！！！ bold");
//! ```

use std::borrow::Cow;

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How a rule's pattern is anchored within the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleScope {
    /// Pattern matches anywhere, as written.
    #[default]
    Inline,
    /// Multi-line mode; the pattern must start at the beginning of a line.
    Line,
    /// Matches from the pattern through the end of the text.
    ToEnd,
    /// Pattern is a fixed phrase, not a regex.
    Literal,
}

/// Serializable description of a cleaning rule, as found in pipeline config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub name: String,
    pub pattern: String,
    #[serde(default)]
    pub replacement: String,
    #[serde(default)]
    pub scope: RuleScope,
}

/// A compiled (pattern, replacement, scope) record.
#[derive(Debug, Clone)]
pub struct CleanRule {
    name: String,
    regex: Regex,
    replacement: String,
    scope: RuleScope,
}

impl CleanRule {
    /// Compiles a rule that deletes whatever `pattern` matches.
    pub fn new(name: &str, pattern: &str, scope: RuleScope) -> Result<Self> {
        let source = match scope {
            RuleScope::Inline => pattern.to_owned(),
            RuleScope::Line => format!("(?m)^(?:{pattern})"),
            RuleScope::ToEnd => format!("(?:{pattern})(?s:.*)"),
            RuleScope::Literal => regex::escape(pattern),
        };
        let regex = Regex::new(&source).map_err(|source| Error::InvalidRule {
            name: name.to_owned(),
            source,
        })?;

        Ok(CleanRule {
            name: name.to_owned(),
            regex,
            replacement: String::new(),
            scope,
        })
    }

    /// Replaces matches with `replacement` instead of deleting them. For
    /// non-literal scopes `$1`-style group references are expanded.
    pub fn with_replacement(mut self, replacement: &str) -> Self {
        self.replacement = replacement.to_owned();
        self
    }

    pub fn from_spec(spec: &RuleSpec) -> Result<Self> {
        Ok(Self::new(&spec.name, &spec.pattern, spec.scope)?.with_replacement(&spec.replacement))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> RuleScope {
        self.scope
    }

    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if self.scope == RuleScope::Literal {
            self.regex.replace_all(text, NoExpand(&self.replacement))
        } else {
            self.regex.replace_all(text, self.replacement.as_str())
        }
    }
}

// Emoji code points: pictograph/emoticon planes, dingbats and misc symbols,
// keycap sequences, ZWJ, variation selectors and tag characters. Geometric
// shapes are left alone apart from the few emoji-presentation ones so that the
// caption marker ▲ survives until the caption rule sees it.
const EMOJI_PATTERN: &str = concat!(
    r"[0-9#*]\x{FE0F}?\x{20E3}",
    r"|[\x{1F000}-\x{1FAFF}\x{2600}-\x{27BF}\x{E0020}-\x{E007F}\x{FE00}-\x{FE0F}\x{200D}\x{20E3}",
    r"\x{231A}\x{231B}\x{2328}\x{23CF}\x{23E9}-\x{23F3}\x{23F8}-\x{23FA}",
    r"\x{2B05}-\x{2B07}\x{2B1B}\x{2B1C}\x{2B50}\x{2B55}\x{3030}\x{303D}\x{3297}\x{3299}",
    r"\x{00A9}\x{00AE}\x{203C}\x{2049}\x{2122}\x{2139}\x{2194}-\x{2199}\x{21A9}\x{21AA}",
    r"\x{24C2}\x{25AA}\x{25AB}\x{25B6}\x{25C0}\x{25FB}-\x{25FE}]",
);

// Order matters: separators go before the footer rule so "---" lines are not
// mistaken for the "--" footer marker; URLs go before the footer rule, which
// therefore has to accept an emptied "文章網址:" line; whitespace
// normalization is not in this list at all and always runs last.
const BUILTIN_RULES: &[(&str, &str, RuleScope)] = &[
    ("emoji", EMOJI_PATTERN, RuleScope::Inline),
    ("separator", r"\s*(?:-{3,}|⸻+)\s*$", RuleScope::Line),
    ("html_tag", r"<[^>]+>", RuleScope::Inline),
    ("url", r"https?://\S+|www\.\S+", RuleScope::Inline),
    ("figure_caption", r"▲[^。]*。（[^）]*）", RuleScope::Inline),
    // Trailing "related news" sections. Greedy to the end of the text: a
    // lead-in appearing mid-article drops everything after it, and `更多`
    // pairs with a `報導` any number of lines later.
    ("more_reports", r"更多(?s:.*)報導", RuleScope::ToEnd),
    ("more_related_news", r"看更多相關新聞", RuleScope::ToEnd),
    ("related_reports", r"相關報導", RuleScope::ToEnd),
    ("further_reading", r"延伸閱讀", RuleScope::ToEnd),
    (
        "ptt_footer",
        concat!(
            r"--\s*\n",
            r"※[ \t]*發信站[:：][^\n]*(?:\n|$)",
            r"(?:※[ \t]*文章網址[:：][^\n]*(?:\n|$))?",
            r"(?:※[ \t]*編輯[:：][^\n]*(?:\n|$))*",
        ),
        RuleScope::Line,
    ),
    ("byline", r"(?:來源：|文章撰文者｜|文章出處：|By[—\-:]+).*", RuleScope::Line),
    ("instagram_title", "Instagram photos and videos", RuleScope::Literal),
    ("instagram_citation", r"Instagram \(.*?\)", RuleScope::Inline),
    ("reporter_byline", r"記者.+\s*[／/].*報導", RuleScope::Inline),
];

static DEFAULT_RULES: Lazy<Vec<CleanRule>> = Lazy::new(|| {
    BUILTIN_RULES
        .iter()
        .map(|(name, pattern, scope)| {
            CleanRule::new(name, pattern, *scope).expect("built-in cleaning rule must compile")
        })
        .collect()
});

static NEWLINE_RUN_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static SPACE_RUN_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());

/// Ordered rule pipeline turning raw scraped text into normalized text.
#[derive(Debug, Clone)]
pub struct TextCleaner {
    rules: Vec<CleanRule>,
}

impl Default for TextCleaner {
    fn default() -> Self {
        Self::new()
    }
}

impl TextCleaner {
    /// Cleaner with the built-in rule list.
    pub fn new() -> Self {
        TextCleaner {
            rules: DEFAULT_RULES.clone(),
        }
    }

    /// Cleaner with a caller-supplied rule list in place of the built-ins.
    /// Whitespace normalization still runs after the last rule.
    pub fn with_rules(rules: Vec<CleanRule>) -> Self {
        TextCleaner { rules }
    }

    /// Appends a rule after every existing one.
    pub fn push_rule(&mut self, rule: CleanRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[CleanRule] {
        &self.rules
    }

    /// Cleans `text`, re-running the rule list until the output is stable so
    /// that `clean(clean(x)) == clean(x)`.
    pub fn clean(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        // A changing pass under deletion-only rules removes at least one byte,
        // so the input length bounds the passes. Only custom rules that
        // rewrite without shrinking can run into the bound.
        let max_passes = text.len() + 1;
        let mut current = self.clean_once(text);
        let mut passes = 1;
        loop {
            let next = self.clean_once(&current);
            if next == current {
                break;
            }
            current = next;
            passes += 1;
            if passes > max_passes {
                warn!("cleaner did not reach a fixed point after {max_passes} passes");
                break;
            }
        }
        debug!(
            "cleaned {} -> {} bytes in {} pass(es)",
            text.len(),
            current.len(),
            passes
        );

        current
    }

    /// [`clean`](Self::clean) for callers holding an optional field; `None`
    /// cleans to the empty string.
    pub fn clean_opt(&self, text: Option<&str>) -> String {
        text.map(|t| self.clean(t)).unwrap_or_default()
    }

    fn clean_once(&self, text: &str) -> String {
        let stripped = self
            .rules
            .iter()
            .fold(text.to_owned(), |acc, rule| rule.apply(&acc).into_owned());
        normalize_whitespace(&stripped)
    }
}

fn normalize_whitespace(text: &str) -> String {
    let text = NEWLINE_RUN_REGEX.replace_all(text, "\n\n");
    let text = SPACE_RUN_REGEX.replace_all(&text, " ");
    text.trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(text: &str) -> String {
        TextCleaner::new().clean(text)
    }

    #[test]
    fn removes_emoji_but_keeps_text() {
        assert_eq!(clean("好吃😋😋 推👍🏻"), "好吃 推");
        assert_eq!(clean("第1️⃣名"), "第名");
        assert_eq!(clean("台灣🇹🇼加油❤️"), "台灣加油");
    }

    #[test]
    fn removes_separator_lines_only() {
        let text = "第一段\n---\n第二段\n⸻\n第三段 -- 結尾";
        assert_eq!(clean(text), "第一段\n\n第二段\n\n第三段 -- 結尾");
    }

    #[test]
    fn removes_figure_caption() {
        let text = "▲川普上台後，其家族光靠加密幣就進帳高達323億。（圖／翻攝自川普臉書）\n正文開始。";
        assert_eq!(clean(text), "正文開始。");
    }

    #[test]
    fn related_news_is_greedy_to_end() {
        let text = "第一段。\n更多三立新聞網報導\n其他標題\n其他內容";
        assert_eq!(clean(text), "第一段。");

        // A lead-in mid-article takes the rest of the article with it.
        let text = "開頭。相關報導指出，後面的內容也會被刪除。";
        assert_eq!(clean(text), "開頭。");

        let text = "正文第一段。更多細節仍待釐清。\n\n第二段內容（中央社報導）";
        assert_eq!(clean(text), "正文第一段。");
    }

    #[test]
    fn deeply_nested_phrases_clean_in_one_call() {
        // Each pass of the literal rule peels one level off the middle.
        let mut nested = String::from("Instagram photos and videos");
        for _ in 0..40 {
            nested = format!("Instagram photos{nested} and videos");
        }
        let once = clean(&format!("正文 {nested}"));
        assert_eq!(once, "正文");
        assert_eq!(clean(&once), once);
    }

    #[test]
    fn removes_bylines_at_line_start_only() {
        let text = "來源：中央社\n內文\n文章撰文者｜王小明\n文章出處：某網站\nBy—Someone\n詳見來源：官網";
        assert_eq!(clean(text), "內文\n\n詳見來源：官網");
    }

    #[test]
    fn removes_instagram_and_reporter_attributions() {
        let text = "某某 (@someone) • Instagram photos and videos\n照片 Instagram (@someone)\n記者王小明／台北報導 今天天氣很好";
        assert_eq!(clean(text), "某某 (@someone) • \n照片 \n 今天天氣很好");
    }

    #[test]
    fn empty_and_none_are_empty() {
        let cleaner = TextCleaner::new();
        assert_eq!(cleaner.clean(""), "");
        assert_eq!(cleaner.clean_opt(None), "");
        assert_eq!(cleaner.clean_opt(Some("  <br>  ")), "");
    }

    #[test]
    fn pushed_rule_runs_after_builtins_and_before_whitespace() {
        let mut cleaner = TextCleaner::new();
        cleaner.push_rule(CleanRule::new("ad", "【廣告】", RuleScope::Literal).unwrap());
        assert_eq!(cleaner.rules().last().map(CleanRule::name), Some("ad"));
        assert_eq!(cleaner.clean("內容  【廣告】  內容"), "內容 內容");
    }

    #[test]
    fn literal_rules_do_not_expand_replacement() {
        let rule = CleanRule::new("dollar", "(x)", RuleScope::Literal)
            .unwrap()
            .with_replacement("$1");
        assert_eq!(rule.apply("a(x)b"), "a$1b");
    }

    #[test]
    fn invalid_rule_reports_name() {
        let err = CleanRule::new("broken", "(", RuleScope::Inline).unwrap_err();
        match err {
            Error::InvalidRule { name, .. } => assert_eq!(name, "broken"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rule_spec_deserializes_with_defaults() {
        let spec: RuleSpec =
            serde_json::from_str(r#"{"name":"promo","pattern":"歡迎訂閱","scope":"to_end"}"#)
                .unwrap();
        assert_eq!(spec.scope, RuleScope::ToEnd);
        assert!(spec.replacement.is_empty());
        let rule = CleanRule::from_spec(&spec).unwrap();
        assert_eq!(rule.apply("正文。歡迎訂閱\n更多"), "正文。");
    }
}
