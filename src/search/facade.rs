//! Query entry point / 查询入口
//!
//! Dispatches a [`SearchQuery`] to one of four modes:
//! - speaker only: NPC and pseudo speaker sub-queries, paginated in order
//! - speaker + keyword: the same plus character voice lines
//! - keyword with a voice filter: hash extra, text, then documents and subtitles
//!   (the last two only for `without`), paginated in order
//! - keyword only: every match ranked in memory, then sliced

use async_trait::async_trait;
use std::time::Instant;

use crate::error::Result;
use crate::models::{
    DocumentRow, LangCode, SearchPage, SearchQuery, SearchResult, SubtitleRow, VoiceFilter,
};
use crate::placeholder;
use crate::search::context::SearchContext;
use crate::search::corpus::{DocumentCorpus, SubtitleCorpus, TextCorpus};
use crate::search::hash_lookup::{HashLookup, PinnedHash};
use crate::search::paginator::{page_offset, PageSource, SequentialPaginator};
use crate::search::pattern::LikePatterns;
use crate::search::ranking::{rank, Rankable};
use crate::search::results::ResultBuilder;
use crate::search::speaker::{SpeakerSearch, SpeakerSubQuery};
use crate::search::voice::{apply_voice_filter, VoiceOracle};
use crate::store::TextStore;

/// Query mode / 查询模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Empty,
    Speaker,
    SpeakerKeyword,
    FilteredKeyword,
    Keyword,
}

/// Query after clamping and trimming / 规范化后的查询
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedQuery {
    pub keyword: Option<String>,
    pub speaker: Option<String>,
    pub lang: LangCode,
    pub page: u64,
    pub page_size: u64,
    pub voice_filter: VoiceFilter,
}

impl NormalizedQuery {
    pub fn from_query(query: &SearchQuery, default_page_size: u32) -> Self {
        let non_blank = |s: &str| {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };
        Self {
            keyword: non_blank(query.keyword.as_str()),
            speaker: query.speaker.as_deref().and_then(non_blank),
            lang: query.lang_code,
            page: query.page.max(1) as u64,
            page_size: if query.page_size < 1 {
                u64::from(default_page_size.max(1))
            } else {
                query.page_size as u64
            },
            voice_filter: query.voice_filter,
        }
    }

    pub fn mode(&self) -> SearchMode {
        match (&self.keyword, &self.speaker) {
            (None, None) => SearchMode::Empty,
            (None, Some(_)) => SearchMode::Speaker,
            (Some(_), Some(_)) => SearchMode::SpeakerKeyword,
            (Some(_), None) if self.voice_filter != VoiceFilter::All => SearchMode::FilteredKeyword,
            (Some(_), None) => SearchMode::Keyword,
        }
    }

    pub fn offset(&self) -> u64 {
        page_offset(self.page, self.page_size)
    }
}

/// Search facade / 搜索门面
pub struct SearchFacade<'a> {
    store: &'a TextStore,
    oracle: &'a dyn VoiceOracle,
    ctx: &'a SearchContext,
}

impl<'a> SearchFacade<'a> {
    pub fn new(store: &'a TextStore, oracle: &'a dyn VoiceOracle, ctx: &'a SearchContext) -> Self {
        Self { store, oracle, ctx }
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<SearchPage> {
        let query = NormalizedQuery::from_query(query, self.ctx.default_page_size);
        let mode = query.mode();
        let started = Instant::now();

        let page = match mode {
            SearchMode::Empty => SearchPage::default(),
            SearchMode::Speaker | SearchMode::SpeakerKeyword => self.search_speaker(&query).await?,
            SearchMode::FilteredKeyword => self.search_filtered(&query).await?,
            SearchMode::Keyword => self.search_ranked(&query).await?,
        };

        tracing::debug!(
            "Keyword query {:?} mode={:?} page={} size={} -> {} of {} in {:?}",
            query.keyword,
            mode,
            query.page,
            query.page_size,
            page.contents.len(),
            page.total,
            started.elapsed()
        );
        Ok(page)
    }

    async fn search_speaker(&self, query: &NormalizedQuery) -> Result<SearchPage> {
        let Some(speaker) = query.speaker.as_deref() else {
            return Ok(SearchPage::default());
        };
        let search = SpeakerSearch::prepare(
            self.store,
            query.lang,
            speaker,
            query.keyword.as_deref(),
            query.voice_filter,
        )
        .await?;
        let builder = ResultBuilder::new(self.store, self.oracle, self.ctx, query.lang);

        let sources: Vec<SpeakerSource<'_>> = search
            .sub_queries()
            .into_iter()
            .map(|sub| SpeakerSource { search: &search, sub, builder: &builder })
            .collect();
        let refs: Vec<&dyn PageSource<SearchResult>> = sources
            .iter()
            .map(|s| s as &dyn PageSource<SearchResult>)
            .collect();

        let page = SequentialPaginator::paginate(&refs, query.offset(), query.page_size).await?;
        Ok(SearchPage { contents: page.items, total: page.total })
    }

    async fn search_filtered(&self, query: &NormalizedQuery) -> Result<SearchPage> {
        let Some(keyword) = query.keyword.as_deref() else {
            return Ok(SearchPage::default());
        };
        let patterns = LikePatterns::build(keyword, query.lang);
        let pinned = HashLookup::resolve(self.store, keyword, query.lang, &patterns).await?;
        let builder = ResultBuilder::new(self.store, self.oracle, self.ctx, query.lang);
        let filter = query.voice_filter;

        let extra = pinned.filter(|p| !p.matches_text).map(|p| HashExtraSource {
            store: self.store,
            hash: p.hash,
            filter,
            builder: &builder,
        });
        let text = TextSource {
            corpus: TextCorpus::new(self.store, query.lang, &patterns),
            pinned: pinned.filter(|p| p.matches_text).map(|p| p.hash),
            filter,
            builder: &builder,
        };
        let corpora = if filter == VoiceFilter::Without {
            Some((
                DocumentSource {
                    corpus: DocumentCorpus::open(self.store, query.lang, &patterns).await?,
                    builder: &builder,
                },
                SubtitleSource {
                    corpus: SubtitleCorpus::new(self.store, query.lang, &patterns),
                    builder: &builder,
                },
            ))
        } else {
            None
        };

        let mut refs: Vec<&dyn PageSource<SearchResult>> = Vec::with_capacity(4);
        if let Some(extra) = &extra {
            refs.push(extra);
        }
        refs.push(&text);
        if let Some((documents, subtitles)) = &corpora {
            refs.push(documents);
            refs.push(subtitles);
        }

        let page = SequentialPaginator::paginate(&refs, query.offset(), query.page_size).await?;
        Ok(SearchPage { contents: page.items, total: page.total })
    }

    async fn search_ranked(&self, query: &NormalizedQuery) -> Result<SearchPage> {
        let Some(keyword) = query.keyword.as_deref() else {
            return Ok(SearchPage::default());
        };
        let lang = query.lang;
        let patterns = LikePatterns::build(keyword, lang);
        let pinned = HashLookup::resolve(self.store, keyword, lang, &patterns).await?;
        let builder = ResultBuilder::new(self.store, self.oracle, self.ctx, lang);
        let in_corpus = pinned.filter(|p| p.matches_text).map(|p| p.hash);

        // Voice tier uses the store-level flag; the oracle is only asked for the returned page.
        let mut candidates = Vec::new();
        for row in TextCorpus::new(self.store, lang, &patterns).fetch_ranked(in_corpus).await? {
            let text = placeholder::render(&row.content, self.ctx.gender, lang);
            candidates.push(Candidate {
                pinned: in_corpus == Some(row.hash),
                voiced: row.voiced,
                text,
                row: CandidateRow::Text(row.hash),
            });
        }
        for row in DocumentCorpus::open(self.store, lang, &patterns).await?.fetch_page(None, 0).await? {
            candidates.push(Candidate::plain(row.content.clone(), CandidateRow::Document(row)));
        }
        for row in SubtitleCorpus::new(self.store, lang, &patterns).fetch_page(None, 0).await? {
            candidates.push(Candidate::plain(row.content.clone(), CandidateRow::Subtitle(row)));
        }

        rank(&mut candidates, keyword, lang, self.ctx.ranking);

        let extra = pinned.filter(|p| !p.matches_text);
        let extra_count = u64::from(extra.is_some());
        let total = candidates.len() as u64 + extra_count;

        let offset = query.offset();
        let mut contents = Vec::new();
        if let (Some(PinnedHash { hash, .. }), 0) = (extra, offset) {
            let mut result = builder.text(hash).await?;
            result.pinned = true;
            contents.push(result);
        }

        let start = offset.saturating_sub(extra_count) as usize;
        let take = query.page_size as usize - contents.len();
        for candidate in candidates.into_iter().skip(start).take(take) {
            contents.push(candidate.build(&builder).await?);
        }

        Ok(SearchPage {
            contents: apply_voice_filter(contents, query.voice_filter),
            total,
        })
    }
}

/// Mode 4 row awaiting ranking / 待排序的候选行
enum CandidateRow {
    Text(i64),
    Document(DocumentRow),
    Subtitle(SubtitleRow),
}

struct Candidate {
    pinned: bool,
    voiced: bool,
    text: String,
    row: CandidateRow,
}

impl Candidate {
    fn plain(text: String, row: CandidateRow) -> Self {
        Self { pinned: false, voiced: false, text, row }
    }

    async fn build(self, builder: &ResultBuilder<'_>) -> Result<SearchResult> {
        match self.row {
            CandidateRow::Text(hash) => {
                let mut result = builder.text(hash).await?;
                result.pinned = self.pinned;
                Ok(result)
            }
            CandidateRow::Document(row) => builder.document(row).await,
            CandidateRow::Subtitle(row) => builder.subtitle(row).await,
        }
    }
}

impl Rankable for Candidate {
    fn is_pinned(&self) -> bool {
        self.pinned
    }

    fn ranking_text(&self, _lang: LangCode) -> Option<&str> {
        Some(&self.text)
    }

    fn is_voiced(&self) -> bool {
        self.voiced
    }
}

struct TextSource<'a> {
    corpus: TextCorpus<'a>,
    pinned: Option<i64>,
    filter: VoiceFilter,
    builder: &'a ResultBuilder<'a>,
}

#[async_trait]
impl<'a> PageSource<SearchResult> for TextSource<'a> {
    fn name(&self) -> &str {
        "text"
    }

    async fn count(&self) -> Result<u64> {
        self.corpus.count_with_voice_filter(self.filter).await
    }

    async fn fetch(&self, limit: u64, offset: u64) -> Result<Vec<SearchResult>> {
        let rows = self.corpus.fetch_page(Some(limit), offset, self.pinned, self.filter).await?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let mut result = self.builder.text(row.hash).await?;
            result.pinned = self.pinned == Some(row.hash);
            results.push(result);
        }
        Ok(results)
    }
}

struct DocumentSource<'a> {
    corpus: DocumentCorpus<'a>,
    builder: &'a ResultBuilder<'a>,
}

#[async_trait]
impl<'a> PageSource<SearchResult> for DocumentSource<'a> {
    fn name(&self) -> &str {
        "documents"
    }

    async fn count(&self) -> Result<u64> {
        self.corpus.count().await
    }

    async fn fetch(&self, limit: u64, offset: u64) -> Result<Vec<SearchResult>> {
        let mut results = Vec::new();
        for row in self.corpus.fetch_page(Some(limit), offset).await? {
            results.push(self.builder.document(row).await?);
        }
        Ok(results)
    }
}

struct SubtitleSource<'a> {
    corpus: SubtitleCorpus<'a>,
    builder: &'a ResultBuilder<'a>,
}

#[async_trait]
impl<'a> PageSource<SearchResult> for SubtitleSource<'a> {
    fn name(&self) -> &str {
        "subtitles"
    }

    async fn count(&self) -> Result<u64> {
        self.corpus.count().await
    }

    async fn fetch(&self, limit: u64, offset: u64) -> Result<Vec<SearchResult>> {
        let mut results = Vec::new();
        for row in self.corpus.fetch_page(Some(limit), offset).await? {
            results.push(self.builder.subtitle(row).await?);
        }
        Ok(results)
    }
}

/// The literal hash when its text does not match the keyword / 哈希直查的额外结果
struct HashExtraSource<'a> {
    store: &'a TextStore,
    hash: i64,
    filter: VoiceFilter,
    builder: &'a ResultBuilder<'a>,
}

#[async_trait]
impl<'a> PageSource<SearchResult> for HashExtraSource<'a> {
    fn name(&self) -> &str {
        "hash"
    }

    async fn count(&self) -> Result<u64> {
        let keep = match self.filter {
            VoiceFilter::All => true,
            VoiceFilter::With => self.store.has_voice_row(self.hash).await?,
            VoiceFilter::Without => !self.store.has_voice_row(self.hash).await?,
        };
        Ok(u64::from(keep))
    }

    async fn fetch(&self, limit: u64, offset: u64) -> Result<Vec<SearchResult>> {
        if limit == 0 || offset > 0 {
            return Ok(Vec::new());
        }
        let mut result = self.builder.text(self.hash).await?;
        result.pinned = true;
        Ok(vec![result])
    }
}

struct SpeakerSource<'a> {
    search: &'a SpeakerSearch<'a>,
    sub: SpeakerSubQuery,
    builder: &'a ResultBuilder<'a>,
}

#[async_trait]
impl<'a> PageSource<SearchResult> for SpeakerSource<'a> {
    fn name(&self) -> &str {
        self.sub.name()
    }

    async fn count(&self) -> Result<u64> {
        self.search.count(self.sub).await
    }

    async fn fetch(&self, limit: u64, offset: u64) -> Result<Vec<SearchResult>> {
        let hits = self.search.fetch(self.sub, limit, offset).await?;
        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            let mut result = self.builder.text(hit.text_hash).await?;
            result.talker = hit.talker;
            results.push(result);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        let query = SearchQuery::new("  你好 ", LangCode::CHS).with_speaker("   ").with_page(0, -3);
        let normalized = NormalizedQuery::from_query(&query, 50);
        assert_eq!(normalized.keyword.as_deref(), Some("你好"));
        assert_eq!(normalized.speaker, None);
        assert_eq!(normalized.page, 1);
        assert_eq!(normalized.page_size, 50);
        assert_eq!(normalized.offset(), 0);
    }

    #[test]
    fn test_mode_dispatch() {
        let mode = |q: SearchQuery| NormalizedQuery::from_query(&q, 50).mode();
        assert_eq!(mode(SearchQuery::new(" ", LangCode::EN)), SearchMode::Empty);
        assert_eq!(mode(SearchQuery::new("", LangCode::EN).with_speaker("Paimon")), SearchMode::Speaker);
        assert_eq!(
            mode(SearchQuery::new("chest", LangCode::EN).with_speaker("Paimon")),
            SearchMode::SpeakerKeyword
        );
        assert_eq!(
            mode(SearchQuery::new("chest", LangCode::EN).with_voice_filter(VoiceFilter::With)),
            SearchMode::FilteredKeyword
        );
        assert_eq!(mode(SearchQuery::new("chest", LangCode::EN)), SearchMode::Keyword);
    }
}
