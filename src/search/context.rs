//! Request-scoped search settings / 请求级搜索上下文

use crate::config::{GenderPreference, SearchConfig};
use crate::models::LangCode;
use crate::search::ranking::RankingOptions;

/// Settings one query runs with, snapshotted from the live config / 单次查询使用的设置快照
#[derive(Debug, Clone)]
pub struct SearchContext {
    pub result_languages: Vec<LangCode>,
    /// Language used for talker names, quest titles and origins / 来源语言
    pub source_language: LangCode,
    pub gender: GenderPreference,
    pub ranking: RankingOptions,
    pub default_page_size: u32,
}

impl SearchContext {
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            result_languages: config.result_languages.clone(),
            source_language: config.source_language,
            gender: config.is_male,
            ranking: RankingOptions {
                missing_text_first: config.missing_text_sorts_first,
            },
            default_page_size: config.default_page_size.max(1),
        }
    }

    /// Result languages with the query language appended when missing / 结果语言（含查询语言）
    pub fn languages_for(&self, query_lang: LangCode) -> Vec<LangCode> {
        let mut langs = self.result_languages.clone();
        if !langs.contains(&query_lang) {
            langs.push(query_lang);
        }
        langs
    }
}

impl Default for SearchContext {
    fn default() -> Self {
        Self::from_config(&SearchConfig::default())
    }
}
