//! In-memory ranking for the plain keyword path / 关键词结果排序

use crate::models::{LangCode, SearchResult};

/// Ranking switches / 排序选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankingOptions {
    /// Results without text in the query language count as length 0 / 缺失文本视为长度0
    pub missing_text_first: bool,
}

impl Default for RankingOptions {
    fn default() -> Self {
        Self { missing_text_first: true }
    }
}

/// What the ranking needs to know about an item / 可排序条目
pub trait Rankable {
    fn is_pinned(&self) -> bool;

    /// Text in the query language, if any / 查询语言下的文本
    fn ranking_text(&self, lang: LangCode) -> Option<&str>;

    /// Only consulted for items that are not exact matches / 仅对非精确匹配调用
    fn is_voiced(&self) -> bool;
}

impl Rankable for SearchResult {
    fn is_pinned(&self) -> bool {
        self.pinned
    }

    fn ranking_text(&self, lang: LangCode) -> Option<&str> {
        self.text_in(lang)
    }

    fn is_voiced(&self) -> bool {
        self.has_voice()
    }
}

/// Sort key, ascending / 排序键（升序）
fn sort_key<T: Rankable>(item: &T, keyword: &str, lang: LangCode, options: RankingOptions) -> (u8, u8, u8, usize) {
    let text = item.ranking_text(lang);
    let exact = text.map_or(false, |t| t.contains(keyword));
    let voiced = !exact && item.is_voiced();
    let length = match text {
        Some(t) => t.chars().count(),
        None if options.missing_text_first => 0,
        None => usize::MAX,
    };

    (u8::from(!item.is_pinned()), u8::from(!exact), u8::from(!voiced), length)
}

/// Stable sort: pinned, exact substring, voiced, shorter text / 稳定排序
pub fn rank<T: Rankable>(items: &mut [T], keyword: &str, lang: LangCode, options: RankingOptions) {
    items.sort_by_cached_key(|item| sort_key(item, keyword, lang, options));
}
