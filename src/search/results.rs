//! Row → [`SearchResult`] conversion / 结果组装
//!
//! Corpus searchers return bare rows; everything a client displays (translations,
//! origin, talker, voice paths) is attached here.

use std::collections::HashMap;

use crate::error::Result;
use crate::models::{DocumentRow, LangCode, ResultSource, SearchResult, SubtitleRow};
use crate::placeholder;
use crate::search::context::SearchContext;
use crate::search::voice::{resolve_voice_paths, VoiceOracle};
use crate::store::TextStore;

/// Origin of text entries that are neither dialogue nor voice lines / 其他文本
pub const OTHER_TEXT_ORIGIN: &str = "其他文本";

const SUBTITLE_LABEL: &str = "字幕";

/// Document category inferred from the file name / 阅读物分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentCategory {
    Book,
    Relic,
    Weapon,
    Wings,
    Costume,
    Letter,
    Card,
    Other,
}

/// File-name prefix table, checked in order / 文件名前缀表
const CATEGORY_PREFIXES: &[(&str, DocumentCategory)] = &[
    ("Book", DocumentCategory::Book),
    ("Relic", DocumentCategory::Relic),
    ("Weapon", DocumentCategory::Weapon),
    ("Wings", DocumentCategory::Wings),
    ("Costume", DocumentCategory::Costume),
    ("Letter", DocumentCategory::Letter),
    ("Card", DocumentCategory::Card),
];

impl DocumentCategory {
    pub fn from_file_name(file_name: &str) -> Self {
        CATEGORY_PREFIXES
            .iter()
            .find(|(prefix, _)| file_name.starts_with(prefix))
            .map(|(_, category)| *category)
            .unwrap_or(DocumentCategory::Other)
    }

    pub fn label(self) -> &'static str {
        match self {
            DocumentCategory::Book => "书籍",
            DocumentCategory::Relic => "圣遗物",
            DocumentCategory::Weapon => "武器",
            DocumentCategory::Wings => "风之翼",
            DocumentCategory::Costume => "衣装",
            DocumentCategory::Letter => "信件",
            DocumentCategory::Card => "卡牌",
            DocumentCategory::Other => "阅读物",
        }
    }
}

/// File name without directory or extension / 去掉目录与扩展名的文件名
pub fn file_stem(file_name: &str) -> &str {
    let name = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

/// Stable 64-bit FNV-1a of a key, used as the id of rows without one / 无ID行的稳定标识
pub fn synthetic_id(key: &str) -> i64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in key.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash as i64
}

/// Builds results for one query / 单次查询的结果构建器
pub struct ResultBuilder<'a> {
    store: &'a TextStore,
    oracle: &'a dyn VoiceOracle,
    ctx: &'a SearchContext,
    langs: Vec<LangCode>,
    query_lang: LangCode,
}

impl<'a> ResultBuilder<'a> {
    pub fn new(store: &'a TextStore, oracle: &'a dyn VoiceOracle, ctx: &'a SearchContext, query_lang: LangCode) -> Self {
        Self {
            store,
            oracle,
            ctx,
            langs: ctx.languages_for(query_lang),
            query_lang,
        }
    }

    pub fn languages(&self) -> &[LangCode] {
        &self.langs
    }

    /// Translations with placeholders rendered / 多语言文本（已替换占位符）
    pub async fn translations(&self, hash: i64) -> Result<Vec<(LangCode, String)>> {
        let rows = self.store.translations(hash, &self.langs).await?;
        Ok(rows
            .into_iter()
            .map(|(content, lang)| (lang, placeholder::render(&content, self.ctx.gender, lang)))
            .collect())
    }

    /// Full text-entry result / 文本条目结果
    pub async fn text(&self, hash: i64) -> Result<SearchResult> {
        let mut result = self.text_without_origin(hash).await?;

        let source_lang = self.ctx.source_language;
        if let Some(origin) = self.store.origin_from_dialogue(hash, source_lang).await? {
            result.origin = origin;
            result.is_talk = true;
        } else if let Some(origin) = self.store.origin_from_fetter(hash, source_lang).await? {
            result.origin = origin;
        } else {
            result.origin = OTHER_TEXT_ORIGIN.to_string();
        }
        Ok(result)
    }

    /// Translations and voice paths only, for scene views / 仅文本与语音
    pub async fn text_without_origin(&self, hash: i64) -> Result<SearchResult> {
        let mut result = SearchResult::new(hash, ResultSource::Text);
        result.translates.extend(self.translations(hash).await?);
        result.voice_paths = resolve_voice_paths(self.store, self.oracle, hash, &self.langs).await?;
        Ok(result)
    }

    pub async fn document(&self, row: DocumentRow) -> Result<SearchResult> {
        let id = row.readable_id.unwrap_or_else(|| synthetic_id(&row.file_name));
        let mut result = SearchResult::new(id, ResultSource::Document);

        let title = match row.title_hash {
            Some(hash) => self.store.text_content(hash, self.ctx.source_language).await?,
            None => None,
        };
        let category = DocumentCategory::from_file_name(&row.file_name);
        result.origin = format!(
            "{} · {}",
            category.label(),
            title.unwrap_or_else(|| file_stem(&row.file_name).to_string())
        );

        let codes = self.folder_codes().await?;
        let folders: Vec<String> = codes.keys().cloned().collect();
        for (content, folder) in self
            .store
            .readable_translations(row.readable_id, &row.file_name, &folders)
            .await?
        {
            if let Some(lang) = codes.get(&folder) {
                result.translates.entry(*lang).or_insert(content);
            }
        }
        result.translates.entry(self.query_lang).or_insert(row.content);

        result.file_name = Some(row.file_name);
        result.readable_id = row.readable_id;
        Ok(result)
    }

    pub async fn subtitle(&self, row: SubtitleRow) -> Result<SearchResult> {
        let id = row
            .subtitle_id
            .unwrap_or_else(|| synthetic_id(&format!("{}@{}", row.file_name, row.start_time)));
        let mut result = SearchResult::new(id, ResultSource::Subtitle);
        result.origin = format!("{} · {}", SUBTITLE_LABEL, file_stem(&row.file_name));

        for (content, lang) in self
            .store
            .subtitle_translations(row.subtitle_id, &row.file_name, row.start_time, &self.langs)
            .await?
        {
            result.translates.entry(lang).or_insert(content);
        }
        result.translates.insert(self.query_lang, row.content);

        result.file_name = Some(row.file_name);
        result.subtitle_id = row.subtitle_id;
        result.start_time = Some(row.start_time);
        result.end_time = Some(row.end_time);
        Ok(result)
    }

    /// Folder code → language for the result languages / 目录代码到语言的映射
    async fn folder_codes(&self) -> Result<HashMap<String, LangCode>> {
        let mut codes = HashMap::new();
        for &lang in &self.langs {
            if let Some(code) = self.store.folder_code(lang).await? {
                codes.insert(code, lang);
            }
        }
        Ok(codes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::voice::StaticVoiceOracle;
    use crate::store::fixtures;

    #[test]
    fn test_document_category_table() {
        assert_eq!(DocumentCategory::from_file_name("Book100"), DocumentCategory::Book);
        assert_eq!(DocumentCategory::from_file_name("Relic10008_4"), DocumentCategory::Relic);
        assert_eq!(DocumentCategory::from_file_name("Weapon11101"), DocumentCategory::Weapon);
        assert_eq!(DocumentCategory::from_file_name("Poem1"), DocumentCategory::Other);
        assert_eq!(DocumentCategory::Other.label(), "阅读物");
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("Cs_MQ01.txt"), "Cs_MQ01");
        assert_eq!(file_stem("Subtitle\\EN\\Cs_MQ01.srt"), "Cs_MQ01");
        assert_eq!(file_stem(".hidden"), ".hidden");
        assert_ne!(synthetic_id("a"), synthetic_id("b"));
    }

    #[tokio::test]
    async fn test_text_result_origin_and_placeholders() {
        let store = TextStore::memory().await;
        fixtures::text(&store, 1, 1, "#{M#他}{F#她}来了").await;
        fixtures::text(&store, 1, 4, "#{M#He}{F#She} is here").await;
        fixtures::text(&store, 10, 1, "派蒙").await;
        fixtures::npc(&store, 5, 10).await;
        fixtures::dialogue(&store, 100, 1000, "TALK_ROLE_NPC", 5, 1, None).await;
        fixtures::text(&store, 2, 1, "普通文本").await;

        let ctx = SearchContext::default();
        let oracle = StaticVoiceOracle::new();
        let builder = ResultBuilder::new(&store, &oracle, &ctx, LangCode::CHS);

        let talk = builder.text(1).await.unwrap();
        assert!(talk.is_talk);
        assert_eq!(talk.origin, "派蒙, 对话文本");
        assert_eq!(talk.text_in(LangCode::CHS), Some("他／她来了"));
        assert_eq!(talk.text_in(LangCode::EN), Some("He/She is here"));

        let other = builder.text(2).await.unwrap();
        assert!(!other.is_talk);
        assert_eq!(other.origin, OTHER_TEXT_ORIGIN);
    }

    #[tokio::test]
    async fn test_fetter_origin() {
        let store = TextStore::memory().await;
        fixtures::text(&store, 10, 1, "胡桃").await;
        fixtures::text(&store, 11, 1, "初次见面…").await;
        fixtures::text(&store, 12, 1, "我是往生堂堂主").await;
        fixtures::avatar(&store, 10000046, 10).await;
        fixtures::fetter(&store, 1, 10000046, 11, 12, 900).await;

        let ctx = SearchContext::default();
        let oracle = StaticVoiceOracle::new();
        let result = ResultBuilder::new(&store, &oracle, &ctx, LangCode::CHS).text(12).await.unwrap();
        assert!(!result.is_talk);
        assert_eq!(result.origin, "胡桃 · 初次见面…");
    }

    #[tokio::test]
    async fn test_document_translations_rejoined_by_id() {
        let store = TextStore::memory().await;
        fixtures::lang(&store, 1, "CHS").await;
        fixtures::lang(&store, 4, "EN").await;
        fixtures::text(&store, 50, 1, "月光下的旅人").await;
        fixtures::readable(&store, "Book7", "CHS", "旅人的故事", Some(50), Some(7)).await;
        fixtures::readable(&store, "Book7", "EN", "A traveler's tale", Some(50), Some(7)).await;

        let ctx = SearchContext::default();
        let oracle = StaticVoiceOracle::new();
        let builder = ResultBuilder::new(&store, &oracle, &ctx, LangCode::CHS);
        let row = DocumentRow {
            file_name: "Book7".into(),
            content: "旅人的故事".into(),
            title_hash: Some(50),
            readable_id: Some(7),
        };
        let result = builder.document(row).await.unwrap();
        assert_eq!(result.hash, 7);
        assert_eq!(result.origin, "书籍 · 月光下的旅人");
        assert_eq!(result.text_in(LangCode::EN), Some("A traveler's tale"));
        assert_eq!(result.source, ResultSource::Document);
    }

    #[tokio::test]
    async fn test_subtitle_translations_by_time_window() {
        let store = TextStore::memory().await;
        fixtures::subtitle(&store, "Cs_01", 1, 10.0, 12.0, "走吧", None).await;
        fixtures::subtitle(&store, "Cs_01", 4, 10.3, 12.0, "Let's go", None).await;
        fixtures::subtitle(&store, "Cs_01", 9, 11.0, 12.0, "行こう", None).await;

        let ctx = SearchContext::default();
        let oracle = StaticVoiceOracle::new();
        let builder = ResultBuilder::new(&store, &oracle, &ctx, LangCode::CHS);
        let row = SubtitleRow {
            file_name: "Cs_01".into(),
            content: "走吧".into(),
            start_time: 10.0,
            end_time: 12.0,
            subtitle_id: None,
        };
        let result = builder.subtitle(row).await.unwrap();
        assert_eq!(result.origin, "字幕 · Cs_01");
        assert_eq!(result.text_in(LangCode::EN), Some("Let's go"));
        // 1.0 s apart, outside the window
        assert_eq!(result.text_in(LangCode::JP), None);
        assert_eq!(result.start_time, Some(10.0));
    }
}
