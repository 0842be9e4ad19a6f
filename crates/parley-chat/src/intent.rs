//! Keyword-triggered intent detection.
//!
//! Each [`IntentKind`] has a fixed keyword set (matched against the
//! lower-cased message) and a pure extraction function producing a typed
//! [`ToolRequest`]. Kinds are independent: one message can trigger any
//! number of them, and they are always evaluated in [`IntentKind::ALL`] order.

use std::fmt;
use std::sync::LazyLock;

use parley_core::ToolParameters;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::IntentError;

// =============================================================================
// Keyword sets and compiled patterns
// =============================================================================

const ARITHMETIC_KEYWORDS: &[&str] = &[
    "计算", "算", "等于", "+", "-", "*", "/", "×", "÷", "calculate", "compute",
];

const WEATHER_KEYWORDS: &[&str] = &["天气", "气温", "温度", "weather", "temperature", "forecast"];

const TIME_KEYWORDS: &[&str] = &[
    "时间",
    "几点",
    "日期",
    "今天",
    "现在",
    "what time",
    "current time",
    "what day",
    "today's date",
];

const TRANSLATION_KEYWORDS: &[&str] = &[
    "翻译",
    "translate",
    "英文",
    "中文",
    "日文",
    "韩文",
    "法文",
    "德文",
    "西班牙文",
    "俄文",
];

const WEB_SEARCH_KEYWORDS: &[&str] = &[
    "搜索", "查找", "查询", "search", "了解", "联网", "上网", "look up", "find out",
];

/// Phrases removed from a message to leave the search query.
const SEARCH_INDICATORS: &[&str] = &[
    "search for",
    "look up",
    "find out",
    "what is",
    "how to",
    "search",
    "什么是",
    "搜索",
    "查找",
    "查询",
    "了解",
    "如何",
    "怎么",
];

/// Search queries must be longer than this many characters.
const MIN_SEARCH_QUERY_CHARS: usize = 2;

const KNOWN_CITIES: &[&str] = &[
    "北京", "上海", "广州", "深圳", "杭州", "南京", "成都", "武汉", "西安", "重庆", "天津",
    "青岛", "大连", "厦门", "苏州", "无锡", "宁波", "长沙", "郑州", "济南", "哈尔滨", "沈阳",
    "长春", "石家庄", "太原", "呼和浩特", "合肥", "福州", "南昌", "南宁", "海口", "贵阳",
    "昆明", "拉萨", "兰州", "西宁", "银川", "乌鲁木齐", "Beijing", "Shanghai", "Guangzhou",
    "Shenzhen", "Hangzhou", "Nanjing", "Chengdu", "Wuhan", "Xi'an", "Chongqing", "Tianjin",
];

static ARITHMETIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[(（]*\d[\d\s.+\-*/()（）×÷]*").expect("Invalid arithmetic regex")
});

static CITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    let mut names: Vec<&str> = KNOWN_CITIES.to_vec();
    // Longest names first so alternation never stops at a shorter prefix
    names.sort_by_key(|n| std::cmp::Reverse(n.chars().count()));
    let alts: Vec<String> = names.iter().map(|n| regex::escape(n)).collect();
    Regex::new(&format!("(?i)(?:{})", alts.join("|"))).expect("Invalid city regex")
});

static QUOTED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["“”‘’「『]([^"“”‘’「」『』]+)["“”‘’」』]"#).expect("Invalid quote regex")
});

static SEARCH_INDICATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alts: Vec<String> = SEARCH_INDICATORS.iter().map(|s| regex::escape(s)).collect();
    Regex::new(&format!("(?i)(?:{})", alts.join("|"))).expect("Invalid search indicator regex")
});

// =============================================================================
// Types
// =============================================================================

/// A category of user need, mapped to exactly one tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Arithmetic,
    Weather,
    Time,
    Translation,
    WebSearch,
}

impl IntentKind {
    /// Every kind, in the order intents are probed and executed.
    pub const ALL: [IntentKind; 5] = [
        IntentKind::Arithmetic,
        IntentKind::Weather,
        IntentKind::Time,
        IntentKind::Translation,
        IntentKind::WebSearch,
    ];

    /// Name of the tool this intent runs.
    pub fn tool_name(self) -> &'static str {
        match self {
            IntentKind::Arithmetic => "calculator",
            IntentKind::Weather => "weather",
            IntentKind::Time => "time",
            IntentKind::Translation => "translate",
            IntentKind::WebSearch => "web_search",
        }
    }

    fn keywords(self) -> &'static [&'static str] {
        match self {
            IntentKind::Arithmetic => ARITHMETIC_KEYWORDS,
            IntentKind::Weather => WEATHER_KEYWORDS,
            IntentKind::Time => TIME_KEYWORDS,
            IntentKind::Translation => TRANSLATION_KEYWORDS,
            IntentKind::WebSearch => WEB_SEARCH_KEYWORDS,
        }
    }

    /// Whether the case-folded message contains any of this kind's keywords.
    pub fn is_triggered(self, lowered: &str) -> bool {
        self.keywords().iter().any(|k| lowered.contains(k))
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntentKind::Arithmetic => "arithmetic",
            IntentKind::Weather => "weather",
            IntentKind::Time => "time",
            IntentKind::Translation => "translation",
            IntentKind::WebSearch => "web_search",
        };
        write!(f, "{}", s)
    }
}

/// Translation target languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Zh,
    Ja,
    Ko,
    Fr,
    De,
    Es,
    Ru,
    En,
}

impl Language {
    /// Used when a message names no language.
    pub const DEFAULT: Language = Language::En;

    /// Synonyms per language, scanned in this order.
    const SYNONYMS: [(Language, &'static [&'static str]); 8] = [
        (Language::Zh, &["中文", "汉语", "chinese"]),
        (Language::Ja, &["日文", "日语", "japanese"]),
        (Language::Ko, &["韩文", "韩语", "korean"]),
        (Language::Fr, &["法文", "法语", "french"]),
        (Language::De, &["德文", "德语", "german"]),
        (Language::Es, &["西班牙文", "西班牙语", "spanish"]),
        (Language::Ru, &["俄文", "俄语", "russian"]),
        (Language::En, &["英文", "英语", "english"]),
    ];

    /// ISO 639-1 code.
    pub fn code(self) -> &'static str {
        match self {
            Language::Zh => "zh",
            Language::Ja => "ja",
            Language::Ko => "ko",
            Language::Fr => "fr",
            Language::De => "de",
            Language::Es => "es",
            Language::Ru => "ru",
            Language::En => "en",
        }
    }

    /// First language (in synonym order) named in the case-folded text.
    pub fn find_in(lowered: &str) -> Option<Language> {
        Self::SYNONYMS
            .iter()
            .find(|(_, words)| words.iter().any(|w| lowered.contains(w)))
            .map(|(lang, _)| *lang)
    }
}

/// A detected intent with its typed parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolRequest {
    Calculate { expression: String },
    Weather { city: String },
    Time,
    Translate { text: String, target_lang: Language },
    WebSearch { query: String },
}

impl ToolRequest {
    pub fn kind(&self) -> IntentKind {
        match self {
            ToolRequest::Calculate { .. } => IntentKind::Arithmetic,
            ToolRequest::Weather { .. } => IntentKind::Weather,
            ToolRequest::Time => IntentKind::Time,
            ToolRequest::Translate { .. } => IntentKind::Translation,
            ToolRequest::WebSearch { .. } => IntentKind::WebSearch,
        }
    }

    pub fn tool_name(&self) -> &'static str {
        self.kind().tool_name()
    }

    /// Parameters in the shape the tool expects.
    pub fn parameters(&self) -> ToolParameters {
        let value = match self {
            ToolRequest::Calculate { expression } => json!({ "expression": expression }),
            ToolRequest::Weather { city } => json!({ "city": city }),
            ToolRequest::Time => json!({}),
            ToolRequest::Translate { text, target_lang } => {
                json!({ "text": text, "target_lang": target_lang.code() })
            }
            ToolRequest::WebSearch { query } => json!({ "query": query }),
        };
        value.as_object().cloned().unwrap_or_default()
    }
}

// =============================================================================
// Extraction
// =============================================================================

/// First numeric-expression run in the text.
pub fn extract_expression(text: &str) -> Option<String> {
    ARITHMETIC_RE
        .find(text)
        .map(|m| m.as_str().trim().to_string())
        .filter(|e| !e.is_empty())
}

/// First known city name in the text, exactly as written.
pub fn extract_city(text: &str) -> Option<String> {
    CITY_RE.find(text).map(|m| m.as_str().to_string())
}

/// First quoted segment, and the target language named outside the quotes.
pub fn extract_translation(text: &str) -> Result<Option<(String, Language)>, IntentError> {
    let Some(caps) = QUOTED_RE.captures(text) else {
        return Ok(None);
    };
    let quoted = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
    if quoted.is_empty() {
        return Err(IntentError::EmptyParameter {
            kind: IntentKind::Translation,
            parameter: "text",
        });
    }

    // The quoted text itself must not pick the target language.
    let outside = QUOTED_RE.replace_all(text, " ").to_lowercase();
    let target = Language::find_in(&outside).unwrap_or(Language::DEFAULT);
    Ok(Some((quoted.to_string(), target)))
}

/// The message with search indicator phrases removed, if enough remains.
pub fn extract_search_query(text: &str) -> Option<String> {
    let stripped = SEARCH_INDICATOR_RE.replace_all(text, " ");
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    let query = collapsed
        .trim_matches(|c: char| {
            c.is_whitespace() || matches!(c, ',' | '，' | ':' | '：' | '?' | '？' | '。' | '!' | '！')
        })
        .to_string();
    (query.chars().count() > MIN_SEARCH_QUERY_CHARS).then_some(query)
}

// =============================================================================
// IntentDetector
// =============================================================================

/// Rule-based intent detector. Pure: holds no state and does no I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntentDetector;

impl IntentDetector {
    pub fn new() -> Self {
        Self
    }

    /// Detect a single intent kind.
    ///
    /// `Ok(None)` means the kind was not triggered or no parameters could be
    /// extracted.
    pub fn detect_kind(
        &self,
        kind: IntentKind,
        text: &str,
    ) -> Result<Option<ToolRequest>, IntentError> {
        let lowered = text.to_lowercase();
        if !kind.is_triggered(&lowered) {
            return Ok(None);
        }

        let request = match kind {
            IntentKind::Arithmetic => {
                extract_expression(text).map(|expression| ToolRequest::Calculate { expression })
            }
            IntentKind::Weather => extract_city(text).map(|city| ToolRequest::Weather { city }),
            IntentKind::Time => Some(ToolRequest::Time),
            IntentKind::Translation => extract_translation(text)?
                .map(|(text, target_lang)| ToolRequest::Translate { text, target_lang }),
            IntentKind::WebSearch => {
                extract_search_query(text).map(|query| ToolRequest::WebSearch { query })
            }
        };
        Ok(request)
    }

    /// Detect every intent in the message, in [`IntentKind::ALL`] order.
    ///
    /// A kind whose detection fails is logged and skipped.
    pub fn detect(&self, text: &str) -> Vec<ToolRequest> {
        IntentKind::ALL
            .iter()
            .filter_map(|&kind| match self.detect_kind(kind, text) {
                Ok(request) => request,
                Err(e) => {
                    tracing::warn!(intent = %kind, error = %e, "Intent detection failed");
                    None
                }
            })
            .collect()
    }
}
