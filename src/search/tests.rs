//! End-to-end search tests against an in-memory store / 端到端搜索测试

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::models::{LangCode, ResultSource, SearchQuery, VoiceFilter};
use crate::store::{fixtures, TextStore};

/// Text = 3, documents = 2, subtitles = 5 hits for "key" in EN / 三类语料的固定数据
async fn corpus_fixture() -> TextStore {
    let store = TextStore::memory().await;
    fixtures::lang(&store, 1, "CHS").await;
    fixtures::lang(&store, 4, "EN").await;

    fixtures::text(&store, 1, 4, "a key here").await;
    fixtures::text(&store, 2, 4, "key").await;
    fixtures::text(&store, 3, 4, "the key is lost").await;
    fixtures::text(&store, 4, 4, "nothing").await;

    fixtures::readable(&store, "Book1", "EN", "a key in a book", None, Some(11)).await;
    fixtures::readable(&store, "Book2", "EN", "keys", None, Some(12)).await;

    for i in 0..5 {
        let start = f64::from(i) * 3.0;
        fixtures::subtitle(&store, "Cs_01", 4, start, start + 2.0, &format!("key line {}", i), None).await;
    }
    store
}

/// Adds an NPC, the player and a character voice line / 追加说话者数据
async fn with_speakers(store: &TextStore) {
    fixtures::text(store, 900, 4, "Paimon").await;
    fixtures::text(store, 901, 4, "Traveler").await;
    fixtures::npc(store, 1, 900).await;
    fixtures::avatar(store, 10000005, 901).await;
    fixtures::avatar(store, 10000020, 900).await;

    fixtures::dialogue(store, 1, 50, "TALK_ROLE_NPC", 1, 1, None).await;
    fixtures::dialogue(store, 2, 50, "TALK_ROLE_NPC", 1, 2, None).await;
    fixtures::dialogue(store, 3, 50, "TALK_ROLE_NPC", 1, 4, None).await;
    fixtures::dialogue(store, 4, 50, "TALK_ROLE_PLAYER", 0, 3, None).await;
    fixtures::dialogue(store, 5, 50, "TALK_ROLE_PLAYER", 0, 4, None).await;

    fixtures::text(store, 5, 4, "key fetter").await;
    fixtures::fetter(store, 1, 10000020, 0, 5, 0).await;
    fixtures::fetter(store, 2, 10000020, 0, 2, 0).await;
}

fn ids(page: &crate::models::SearchPage) -> Vec<(ResultSource, i64)> {
    page.contents.iter().map(|r| (r.source, r.hash)).collect()
}

/// Walk every page and check the union against `total` / 遍历所有页并校验完整性
async fn assert_complete(facade: &SearchFacade<'_>, query: SearchQuery, page_size: i64) -> Vec<(ResultSource, i64)> {
    let first = facade.search(&query.clone().with_page(1, page_size)).await.unwrap();
    let total = first.total;
    let pages = (total + page_size as u64 - 1) / page_size as u64;

    let mut all = Vec::new();
    for page in 1..=pages.max(1) {
        let result = facade.search(&query.clone().with_page(page as i64, page_size)).await.unwrap();
        assert_eq!(result.total, total, "total must not change between pages");
        all.extend(ids(&result));
    }
    let past_end = facade.search(&query.clone().with_page(pages as i64 + 1, page_size)).await.unwrap();
    assert!(past_end.contents.is_empty());

    assert_eq!(all.len() as u64, total, "page size {}", page_size);
    let unique: HashSet<_> = all.iter().collect();
    assert_eq!(unique.len(), all.len(), "duplicate across pages at size {}", page_size);
    all
}

#[tokio::test]
async fn test_empty_query_short_circuits() {
    let store = corpus_fixture().await;
    let ctx = SearchContext::default();
    let oracle = StaticVoiceOracle::new();
    let facade = SearchFacade::new(&store, &oracle, &ctx);

    let page = facade.search(&SearchQuery::new("   ", LangCode::EN).with_speaker(" ")).await.unwrap();
    assert!(page.contents.is_empty());
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn test_ranked_mode_is_complete() {
    let store = corpus_fixture().await;
    let ctx = SearchContext::default();
    let oracle = StaticVoiceOracle::new();
    let facade = SearchFacade::new(&store, &oracle, &ctx);

    for size in [1, 3, 4, 10, 50] {
        let all = assert_complete(&facade, SearchQuery::new("key", LangCode::EN), size).await;
        assert_eq!(all.len(), 10);
    }
}

#[tokio::test]
async fn test_filtered_mode_is_complete_and_skips_by_offset() {
    let store = corpus_fixture().await;
    let ctx = SearchContext::default();
    let oracle = StaticVoiceOracle::new();
    let facade = SearchFacade::new(&store, &oracle, &ctx);
    let query = SearchQuery::new("key", LangCode::EN).with_voice_filter(VoiceFilter::Without);

    for size in [1, 2, 3, 7, 10] {
        assert_complete(&facade, query.clone(), size).await;
    }

    // Offsets 3..6 lie past the three text entries
    let page = facade.search(&query.clone().with_page(2, 3)).await.unwrap();
    assert_eq!(page.total, 10);
    let got = ids(&page);
    assert_eq!(&got[..2], &[(ResultSource::Document, 12), (ResultSource::Document, 11)]);
    assert_eq!(got[2].0, ResultSource::Subtitle);
    assert_eq!(page.contents[2].start_time, Some(0.0));

    // Offset 4 with size 2 starts inside the documents
    let page = facade.search(&query.clone().with_page(3, 2)).await.unwrap();
    let got = ids(&page);
    assert_eq!(got[0], (ResultSource::Document, 11));
    assert_eq!(got[1].0, ResultSource::Subtitle);
}

#[tokio::test]
async fn test_with_voice_excludes_documents_and_subtitles() {
    let store = corpus_fixture().await;
    fixtures::dialogue(&store, 1, 50, "TALK_ROLE_NPC", 1, 1, None).await;
    fixtures::voice(&store, 1, "VO_1.wem", 0).await;

    let ctx = SearchContext::default();
    let oracle = StaticVoiceOracle::new().with_clip("VO_1.wem", LangCode::EN, vec![0]);
    let facade = SearchFacade::new(&store, &oracle, &ctx);

    let with = facade
        .search(&SearchQuery::new("key", LangCode::EN).with_voice_filter(VoiceFilter::With))
        .await
        .unwrap();
    assert_eq!(with.total, 1);
    assert_eq!(with.contents[0].hash, 1);
    assert_eq!(with.contents[0].voice_paths, vec!["VO_1.wem"]);

    let without = facade
        .search(&SearchQuery::new("key", LangCode::EN).with_voice_filter(VoiceFilter::Without))
        .await
        .unwrap();
    assert_eq!(without.total, 9);
    assert!(without.contents.iter().all(|r| r.hash != 1));
}

#[tokio::test]
async fn test_speaker_modes_are_complete() {
    let store = corpus_fixture().await;
    with_speakers(&store).await;
    let ctx = SearchContext::default();
    let oracle = StaticVoiceOracle::new();
    let facade = SearchFacade::new(&store, &oracle, &ctx);

    let speaker_only = SearchQuery::new("", LangCode::EN).with_speaker("a");
    for size in [1, 2, 3, 10] {
        let all = assert_complete(&facade, speaker_only.clone(), size).await;
        let hashes: Vec<i64> = all.iter().map(|(_, h)| *h).collect();
        assert_eq!(hashes, vec![1, 2, 4, 3]);
    }

    let with_keyword = SearchQuery::new("key", LangCode::EN).with_speaker("a");
    for size in [1, 2, 5] {
        let all = assert_complete(&facade, with_keyword.clone(), size).await;
        let hashes: Vec<i64> = all.iter().map(|(_, h)| *h).collect();
        assert_eq!(hashes, vec![2, 1, 3, 5]);
    }

    let page = facade.search(&with_keyword).await.unwrap();
    let talkers: Vec<_> = page.contents.iter().map(|r| r.talker.clone().unwrap_or_default()).collect();
    assert_eq!(talkers, vec!["Paimon", "Paimon", "主角", "Paimon"]);
}

#[tokio::test]
async fn test_fuzzy_matching_depends_on_language() {
    let store = TextStore::memory().await;
    fixtures::text(&store, 1, 1, "你 好").await;
    fixtures::text(&store, 1, 4, "你 好").await;
    let ctx = SearchContext::default();
    let oracle = StaticVoiceOracle::new();
    let facade = SearchFacade::new(&store, &oracle, &ctx);

    let zh = facade.search(&SearchQuery::new("你好", LangCode::CHS)).await.unwrap();
    assert_eq!(zh.total, 1);
    assert_eq!(zh.contents[0].text_in(LangCode::CHS), Some("你 好"));

    let en = facade.search(&SearchQuery::new("你好", LangCode::EN)).await.unwrap();
    assert_eq!(en.total, 0);
}

#[tokio::test]
async fn test_ranking_exact_then_voiced_then_rest() {
    let store = TextStore::memory().await;
    fixtures::text(&store, 10, 1, "你好啊，旅行者，今天天气真好").await;
    fixtures::text(&store, 20, 1, "你 ，好").await;
    fixtures::text(&store, 30, 1, "你 好").await;
    fixtures::dialogue(&store, 1, 50, "TALK_ROLE_NPC", 1, 20, None).await;
    fixtures::voice(&store, 1, "VO_b.wem", 0).await;

    let ctx = SearchContext::default();
    let oracle = StaticVoiceOracle::new().with_clip("VO_b.wem", LangCode::CHS, vec![0]);
    let facade = SearchFacade::new(&store, &oracle, &ctx);

    let page = facade.search(&SearchQuery::new("你好", LangCode::CHS)).await.unwrap();
    let hashes: Vec<i64> = page.contents.iter().map(|r| r.hash).collect();
    assert_eq!(hashes, vec![10, 20, 30]);
    assert!(page.contents[1].has_voice());
}

/// Counts asset lookups / 统计语音查询次数
struct CountingOracle {
    inner: StaticVoiceOracle,
    lookups: AtomicUsize,
}

#[async_trait]
impl VoiceOracle for CountingOracle {
    async fn exists(&self, path: &str, lang: LangCode) -> bool {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.exists(path, lang).await
    }

    async fn read(&self, path: &str, lang: LangCode) -> Option<Vec<u8>> {
        self.inner.read(path, lang).await
    }

    fn loaded_languages(&self) -> Vec<LangCode> {
        self.inner.loaded_languages()
    }
}

#[tokio::test]
async fn test_ranking_asks_oracle_only_for_returned_page() {
    let store = TextStore::memory().await;
    fixtures::text(&store, 1, 1, "你好").await;
    let mut inner = StaticVoiceOracle::new();
    for i in 0..20 {
        let hash = 100 + i;
        let path = format!("VO_{}.wem", hash);
        fixtures::text(&store, hash, 1, &format!("你 好{}", i)).await;
        fixtures::dialogue(&store, hash, 50, "TALK_ROLE_NPC", 1, hash, None).await;
        fixtures::voice(&store, hash, &path, 0).await;
        inner = inner.with_clip(&path, LangCode::CHS, vec![0]);
    }
    fixtures::text(&store, 200, 1, "你 好").await;

    let ctx = SearchContext::default();
    let oracle = CountingOracle { inner, lookups: AtomicUsize::new(0) };
    let facade = SearchFacade::new(&store, &oracle, &ctx);

    let page = facade.search(&SearchQuery::new("你好", LangCode::CHS).with_page(1, 2)).await.unwrap();
    assert_eq!(page.total, 22);
    assert_eq!(page.contents[0].hash, 1);
    // Voiced fuzzy lines rank ahead of the shorter silent one
    assert_eq!(page.contents[1].hash, 100);
    assert!(page.contents[1].has_voice());

    let langs = ctx.languages_for(LangCode::CHS).len();
    assert!(oracle.lookups.load(Ordering::SeqCst) <= 2 * langs);
}

#[tokio::test]
async fn test_literal_hash_is_pinned_first() {
    let store = TextStore::memory().await;
    fixtures::text(&store, 1234, 4, "Hello").await;
    fixtures::text(&store, 5, 4, "Room 1234").await;
    let ctx = SearchContext::default();
    let oracle = StaticVoiceOracle::new();
    let facade = SearchFacade::new(&store, &oracle, &ctx);

    let page = facade.search(&SearchQuery::new("1234", LangCode::EN)).await.unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.contents[0].hash, 1234);
    assert_eq!(page.contents[1].hash, 5);

    let second = facade.search(&SearchQuery::new("1234", LangCode::EN).with_page(2, 1)).await.unwrap();
    assert_eq!(second.contents.len(), 1);
    assert_eq!(second.contents[0].hash, 5);

    let filtered = facade
        .search(&SearchQuery::new("1234", LangCode::EN).with_voice_filter(VoiceFilter::Without))
        .await
        .unwrap();
    assert_eq!(filtered.total, 2);
    assert_eq!(filtered.contents[0].hash, 1234);
}

#[tokio::test]
async fn test_literal_hash_matching_text_is_not_duplicated() {
    let store = TextStore::memory().await;
    fixtures::text(&store, 77, 4, "Gate 77").await;
    fixtures::text(&store, 8, 4, "77").await;
    let ctx = SearchContext::default();
    let oracle = StaticVoiceOracle::new();
    let facade = SearchFacade::new(&store, &oracle, &ctx);

    let page = facade.search(&SearchQuery::new("77", LangCode::EN)).await.unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.contents.iter().map(|r| r.hash).collect::<Vec<_>>(), vec![77, 8]);
}

#[tokio::test]
async fn test_repeated_queries_are_identical() {
    let store = corpus_fixture().await;
    with_speakers(&store).await;
    let ctx = SearchContext::default();
    let oracle = StaticVoiceOracle::new();
    let facade = SearchFacade::new(&store, &oracle, &ctx);

    for query in [
        SearchQuery::new("key", LangCode::EN),
        SearchQuery::new("key", LangCode::EN).with_voice_filter(VoiceFilter::Without),
        SearchQuery::new("key", LangCode::EN).with_speaker("a"),
    ] {
        let a = serde_json::to_string(&facade.search(&query).await.unwrap()).unwrap();
        let b = serde_json::to_string(&facade.search(&query).await.unwrap()).unwrap();
        assert_eq!(a, b);
    }
}

#[tokio::test]
async fn test_page_input_is_clamped() {
    let store = corpus_fixture().await;
    let ctx = SearchContext::default();
    let oracle = StaticVoiceOracle::new();
    let facade = SearchFacade::new(&store, &oracle, &ctx);

    let clamped = facade
        .search(&SearchQuery::new("key", LangCode::EN).with_page(-2, 0))
        .await
        .unwrap();
    let normal = facade.search(&SearchQuery::new("key", LangCode::EN)).await.unwrap();
    assert_eq!(clamped, normal);
    assert_eq!(clamped.contents.len(), 10);
}
