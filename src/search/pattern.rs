//! Keyword → LIKE pattern construction / 关键词模式构建
//!
//! Every corpus query matches `content LIKE exact OR content LIKE fuzzy`, both with
//! `ESCAPE '\'`. For logographic languages the fuzzy pattern is the keyword's
//! non-whitespace characters joined by `%`, which recovers re-spaced or
//! re-punctuated copies of the same line.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::LangCode;

static HASH_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^([+-]?)(?:0x([0-9a-f]+)|(\d+))$").expect("valid hash literal regex"));

/// Escape LIKE metacharacters / 转义 LIKE 元字符
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Exact and fuzzy LIKE patterns for one keyword / 精确与模糊模式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikePatterns {
    /// `%keyword%`
    pub exact: String,
    /// `%k%e%y%` for logographic languages, otherwise equal to `exact`
    pub fuzzy: String,
    needle: String,
    skeleton: Vec<char>,
}

impl LikePatterns {
    pub fn build(keyword: &str, lang: LangCode) -> Self {
        let exact = format!("%{}%", escape_like(keyword));
        let skeleton: Vec<char> = if lang.is_logographic() {
            keyword.chars().filter(|c| !c.is_whitespace()).collect()
        } else {
            Vec::new()
        };

        let fuzzy = if skeleton.is_empty() {
            exact.clone()
        } else {
            let parts: Vec<String> = skeleton.iter().map(|c| escape_like(&c.to_string())).collect();
            format!("%{}%", parts.join("%"))
        };

        Self {
            exact,
            fuzzy,
            needle: keyword.to_ascii_lowercase(),
            skeleton: skeleton.iter().map(|c| c.to_ascii_lowercase()).collect(),
        }
    }

    /// Whether fuzzy matching differs from exact matching / 是否启用模糊匹配
    pub fn is_fuzzy(&self) -> bool {
        self.fuzzy != self.exact
    }

    /// In-memory mirror of `text LIKE exact OR text LIKE fuzzy` / 内存匹配
    ///
    /// Follows SQLite: ASCII letters compare case-insensitively, everything else exactly.
    pub fn matches(&self, text: &str) -> bool {
        self.matches_exact(text) || self.matches_fuzzy(text)
    }

    pub fn matches_exact(&self, text: &str) -> bool {
        text.to_ascii_lowercase().contains(&self.needle)
    }

    fn matches_fuzzy(&self, text: &str) -> bool {
        if self.skeleton.is_empty() {
            return false;
        }
        let mut wanted = self.skeleton.iter().peekable();
        for ch in text.chars() {
            match wanted.peek() {
                Some(&&w) if w == ch.to_ascii_lowercase() => {
                    wanted.next();
                }
                Some(_) => {}
                None => break,
            }
        }
        wanted.peek().is_none()
    }
}

/// SQL expression comparing a display name, whitespace removed for logographic text / 名称比较表达式
pub fn name_expr(column: &str, lang: LangCode) -> String {
    if lang.is_logographic() {
        format!("replace(replace({}, ' ', ''), '　', '')", column)
    } else {
        column.to_string()
    }
}

/// Parse a keyword that is itself an integer or hex text id / 解析哈希字面量
pub fn parse_hash_literal(keyword: &str) -> Option<i64> {
    let caps = HASH_LITERAL.captures(keyword.trim())?;
    let negative = &caps[1] == "-";

    let value = if let Some(hex) = caps.get(2) {
        u64::from_str_radix(hex.as_str(), 16).ok()? as i64
    } else {
        let digits = caps.get(3)?.as_str();
        match digits.parse::<i64>() {
            Ok(v) => v,
            Err(_) => digits.parse::<u64>().ok()? as i64,
        }
    };

    Some(if negative { value.wrapping_neg() } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%_a\\b"), "100\\%\\_a\\\\b");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_exact_only_for_alphabetic_languages() {
        let p = LikePatterns::build("hello world", LangCode::EN);
        assert_eq!(p.exact, "%hello world%");
        assert_eq!(p.fuzzy, p.exact);
        assert!(!p.is_fuzzy());
    }

    #[test]
    fn test_fuzzy_skeleton_for_chinese() {
        let p = LikePatterns::build("你 好%", LangCode::CHS);
        assert_eq!(p.exact, "%你 好\\%%");
        assert_eq!(p.fuzzy, "%你%好%\\%%");
        let blank = LikePatterns::build("   ", LangCode::CHT);
        assert_eq!(blank.fuzzy, blank.exact);
    }

    #[test]
    fn test_in_memory_matching() {
        let zh = LikePatterns::build("你好", LangCode::CHS);
        assert!(zh.matches("你 好"));
        assert!(zh.matches("说你好呀"));
        assert!(!zh.matches("好你"));

        // Same bytes under a non-logographic language stay exact.
        let en = LikePatterns::build("你好", LangCode::EN);
        assert!(!en.matches("你 好"));
        assert!(en.matches("你好"));

        let ascii = LikePatterns::build("Paimon", LangCode::EN);
        assert!(ascii.matches("PAIMON says"));
    }

    #[test]
    fn test_parse_hash_literal() {
        assert_eq!(parse_hash_literal("1234"), Some(1234));
        assert_eq!(parse_hash_literal("+42"), Some(42));
        assert_eq!(parse_hash_literal("-7"), Some(-7));
        assert_eq!(parse_hash_literal("0x1F"), Some(31));
        assert_eq!(parse_hash_literal("0XFFFFFFFFFFFFFFFF"), Some(-1));
        assert_eq!(parse_hash_literal("18446744073709551615"), Some(-1));
        assert_eq!(parse_hash_literal("12a"), None);
        assert_eq!(parse_hash_literal("0x"), None);
        assert_eq!(parse_hash_literal(""), None);
    }

    #[test]
    fn test_name_expr() {
        assert_eq!(name_expr("n.content", LangCode::EN), "n.content");
        assert!(name_expr("n.content", LangCode::CHS).starts_with("replace(replace(n.content"));
    }
}
