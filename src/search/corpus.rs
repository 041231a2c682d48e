//! Per-corpus keyword queries / 各语料库的关键词查询
//!
//! Each corpus answers `count` and `fetch_page` over one deterministic total order:
//! exact matches before fuzzy-only matches, shorter content first, then a unique
//! column so that pages never overlap.

use sqlx::{QueryBuilder, Sqlite};

use crate::error::Result;
use crate::models::{DocumentRow, LangCode, RankedTextRow, SubtitleRow, TextRow, VoiceFilter};
use crate::search::pattern::LikePatterns;
use crate::store::{voice_exists_expr, TextStore};

/// `AND (col LIKE exact OR col LIKE fuzzy)` / 追加匹配条件
pub(crate) fn push_match(qb: &mut QueryBuilder<'_, Sqlite>, column: &str, patterns: &LikePatterns) {
    qb.push(" AND (")
        .push(column)
        .push(" LIKE ")
        .push_bind(patterns.exact.clone())
        .push(" ESCAPE '\\' OR ")
        .push(column)
        .push(" LIKE ")
        .push_bind(patterns.fuzzy.clone())
        .push(" ESCAPE '\\')");
}

/// `CASE WHEN col LIKE exact THEN 0 ELSE 1 END` / 精确匹配优先
pub(crate) fn push_exact_rank(qb: &mut QueryBuilder<'_, Sqlite>, column: &str, patterns: &LikePatterns) {
    qb.push("CASE WHEN ")
        .push(column)
        .push(" LIKE ")
        .push_bind(patterns.exact.clone())
        .push(" ESCAPE '\\' THEN 0 ELSE 1 END");
}

/// Store-level voice predicate / 语音记录筛选条件
pub(crate) fn push_voice_filter(qb: &mut QueryBuilder<'_, Sqlite>, field: &str, filter: VoiceFilter) {
    match filter {
        VoiceFilter::All => {}
        VoiceFilter::With => {
            qb.push(" AND ").push(voice_exists_expr(field));
        }
        VoiceFilter::Without => {
            qb.push(" AND NOT ").push(voice_exists_expr(field));
        }
    }
}

fn push_window(qb: &mut QueryBuilder<'_, Sqlite>, limit: Option<u64>, offset: u64) {
    match limit {
        Some(limit) => {
            qb.push(" LIMIT ").push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        None => {
            qb.push(" LIMIT -1");
        }
    }
    qb.push(" OFFSET ").push_bind(i64::try_from(offset).unwrap_or(i64::MAX));
}

async fn fetch_count(qb: &mut QueryBuilder<'_, Sqlite>, store: &TextStore) -> Result<u64> {
    let count: i64 = qb.build_query_scalar().fetch_one(store.pool()).await?;
    Ok(count.max(0) as u64)
}

/// Text entries (`textMap`) / 文本条目
pub struct TextCorpus<'a> {
    store: &'a TextStore,
    lang: LangCode,
    patterns: &'a LikePatterns,
}

impl<'a> TextCorpus<'a> {
    pub fn new(store: &'a TextStore, lang: LangCode, patterns: &'a LikePatterns) -> Self {
        Self { store, lang, patterns }
    }

    fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>, filter: VoiceFilter) {
        qb.push(" FROM textMap WHERE lang = ").push_bind(self.lang.0);
        push_match(qb, "content", self.patterns);
        push_voice_filter(qb, "textMap.hash", filter);
    }

    pub async fn count(&self) -> Result<u64> {
        self.count_with_voice_filter(VoiceFilter::All).await
    }

    pub async fn count_with_voice_filter(&self, filter: VoiceFilter) -> Result<u64> {
        let mut qb = QueryBuilder::new("SELECT count(*)");
        self.push_where(&mut qb, filter);
        fetch_count(&mut qb, self.store).await
    }

    /// Pinned hash, exact, length, hash / 置顶哈希、精确、长度、哈希
    fn push_order(&self, qb: &mut QueryBuilder<'_, Sqlite>, pinned: Option<i64>) {
        qb.push(" ORDER BY ");
        if let Some(hash) = pinned {
            qb.push("CASE WHEN hash = ").push_bind(hash).push(" THEN 0 ELSE 1 END, ");
        }
        push_exact_rank(qb, "content", self.patterns);
        qb.push(", length(content), hash");
    }

    pub async fn fetch_page(
        &self,
        limit: Option<u64>,
        offset: u64,
        pinned: Option<i64>,
        filter: VoiceFilter,
    ) -> Result<Vec<TextRow>> {
        let mut qb = QueryBuilder::new("SELECT hash, content");
        self.push_where(&mut qb, filter);
        self.push_order(&mut qb, pinned);
        push_window(&mut qb, limit, offset);

        let rows = qb.build_query_as().fetch_all(self.store.pool()).await?;
        Ok(rows)
    }

    /// Every match with its voice-row flag, in corpus order / 全部命中及语音标记
    pub async fn fetch_ranked(&self, pinned: Option<i64>) -> Result<Vec<RankedTextRow>> {
        let mut qb = QueryBuilder::new("SELECT hash, content, ");
        qb.push(voice_exists_expr("textMap.hash")).push(" AS voiced");
        self.push_where(&mut qb, VoiceFilter::All);
        self.push_order(&mut qb, pinned);

        let rows = qb.build_query_as().fetch_all(self.store.pool()).await?;
        Ok(rows)
    }
}

/// Documents (`readable`), keyed by folder code / 阅读物
pub struct DocumentCorpus<'a> {
    store: &'a TextStore,
    folder: Option<String>,
    patterns: &'a LikePatterns,
}

impl<'a> DocumentCorpus<'a> {
    /// Resolves the folder code of `lang`; a language without one has no documents / 解析语言目录代码
    pub async fn open(store: &'a TextStore, lang: LangCode, patterns: &'a LikePatterns) -> Result<Self> {
        let folder = store.folder_code(lang).await?;
        if folder.is_none() {
            tracing::debug!("No readable folder code for lang {}", lang);
        }
        Ok(Self { store, folder, patterns })
    }

    fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>, folder: &str) {
        qb.push(" FROM readable WHERE lang = ").push_bind(folder.to_string());
        push_match(qb, "content", self.patterns);
    }

    pub async fn count(&self) -> Result<u64> {
        let Some(folder) = &self.folder else {
            return Ok(0);
        };
        let mut qb = QueryBuilder::new("SELECT count(*)");
        self.push_where(&mut qb, folder);
        fetch_count(&mut qb, self.store).await
    }

    pub async fn fetch_page(&self, limit: Option<u64>, offset: u64) -> Result<Vec<DocumentRow>> {
        let Some(folder) = &self.folder else {
            return Ok(Vec::new());
        };
        let mut qb = QueryBuilder::new("SELECT fileName, content, titleTextMapHash, readableId");
        self.push_where(&mut qb, folder);
        qb.push(" ORDER BY ");
        push_exact_rank(&mut qb, "content", self.patterns);
        qb.push(", length(content), fileName");
        push_window(&mut qb, limit, offset);

        let rows = qb.build_query_as().fetch_all(self.store.pool()).await?;
        Ok(rows)
    }
}

/// Subtitle lines (`subtitle`) / 字幕
pub struct SubtitleCorpus<'a> {
    store: &'a TextStore,
    lang: LangCode,
    patterns: &'a LikePatterns,
}

impl<'a> SubtitleCorpus<'a> {
    pub fn new(store: &'a TextStore, lang: LangCode, patterns: &'a LikePatterns) -> Self {
        Self { store, lang, patterns }
    }

    fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push(" FROM subtitle WHERE lang = ").push_bind(self.lang.0);
        push_match(qb, "content", self.patterns);
    }

    pub async fn count(&self) -> Result<u64> {
        let mut qb = QueryBuilder::new("SELECT count(*)");
        self.push_where(&mut qb);
        fetch_count(&mut qb, self.store).await
    }

    pub async fn fetch_page(&self, limit: Option<u64>, offset: u64) -> Result<Vec<SubtitleRow>> {
        let mut qb = QueryBuilder::new("SELECT fileName, content, startTime, endTime, subtitleId");
        self.push_where(&mut qb);
        qb.push(" ORDER BY ");
        push_exact_rank(&mut qb, "content", self.patterns);
        qb.push(", length(content), fileName, startTime, rowid");
        push_window(&mut qb, limit, offset);

        let rows = qb.build_query_as().fetch_all(self.store.pool()).await?;
        Ok(rows)
    }
}
