//! Name lookups for quests, documents and characters / 名称检索
//!
//! Unlike the keyword search these match titles and identifiers, not body text.
//! Every list is capped at [`NAME_LIMIT`] entries.

use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite};
use std::collections::HashMap;

use crate::error::Result;
use crate::models::LangCode;
use crate::search::context::SearchContext;
use crate::search::corpus::{push_exact_rank, push_match};
use crate::search::pattern::{escape_like, LikePatterns};
use crate::search::results::DocumentCategory;
use crate::search::voice::VoiceOracle;
use crate::store::TextStore;

/// Row cap of every name query / 名称查询上限
pub const NAME_LIMIT: i64 = 200;

/// Row cap of one character's voice list / 角色语音上限
pub const AVATAR_VOICE_LIMIT: i64 = 400;

const CHAPTER_COLUMNS: [&str; 2] = ["chapterTitle.content", "chapterNum.content"];

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QuestNameHit {
    pub quest_id: i64,
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter_num: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadableNameHit {
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readable_id: Option<i64>,
    pub title: Option<String>,
    pub category: String,
}

#[derive(Debug, sqlx::FromRow)]
struct ReadableNameRow {
    file_name: String,
    readable_id: Option<i64>,
    title: Option<String>,
}

impl From<ReadableNameRow> for ReadableNameHit {
    fn from(row: ReadableNameRow) -> Self {
        Self {
            category: DocumentCategory::from_file_name(&row.file_name).label().to_string(),
            file_name: row.file_name,
            readable_id: row.readable_id,
            title: row.title,
        }
    }
}

/// Response of `/api/nameSearch` / 名称检索结果
#[derive(Debug, Clone, Default, Serialize)]
pub struct NameSearchResult {
    pub quests: Vec<QuestNameHit>,
    pub readables: Vec<ReadableNameHit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AvatarHit {
    pub avatar_id: i64,
    pub name: String,
}

/// One character voice line with its playable paths / 角色语音条目
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarVoiceItem {
    pub fetter_id: i64,
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_hash: Option<i64>,
    pub text: Option<String>,
    pub voice_paths: Vec<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct AvatarVoiceRow {
    fetter_id: i64,
    title_hash: Option<i64>,
    text_hash: Option<i64>,
    voice_path: Option<String>,
}

/// `AND (a LIKE exact OR b LIKE exact OR a LIKE fuzzy OR b LIKE fuzzy)` / 多列匹配
fn push_match_any(qb: &mut QueryBuilder<'_, Sqlite>, columns: &[&str], patterns: &LikePatterns) {
    qb.push(" AND (");
    let mut first = true;
    for pattern in [&patterns.exact, &patterns.fuzzy] {
        for column in columns {
            if !first {
                qb.push(" OR ");
            }
            first = false;
            qb.push(*column)
                .push(" LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\'");
        }
    }
    qb.push(")");
}

/// First hit of each quest wins; later hits only fill in missing fields / 按任务去重
fn merge_quests(groups: Vec<Vec<QuestNameHit>>) -> Vec<QuestNameHit> {
    let mut index: HashMap<i64, usize> = HashMap::new();
    let mut merged: Vec<QuestNameHit> = Vec::new();
    for hit in groups.into_iter().flatten() {
        match index.get(&hit.quest_id) {
            Some(&i) => {
                let kept = &mut merged[i];
                kept.title = kept.title.take().or(hit.title);
                kept.chapter_title = kept.chapter_title.take().or(hit.chapter_title);
                kept.chapter_num = kept.chapter_num.take().or(hit.chapter_num);
            }
            None => {
                index.insert(hit.quest_id, merged.len());
                merged.push(hit);
            }
        }
    }
    merged.truncate(NAME_LIMIT as usize);
    merged
}

fn merge_readables(groups: Vec<Vec<ReadableNameHit>>) -> Vec<ReadableNameHit> {
    let mut seen = std::collections::HashSet::new();
    let mut merged: Vec<ReadableNameHit> = groups
        .into_iter()
        .flatten()
        .filter(|hit| seen.insert(hit.file_name.clone()))
        .collect();
    merged.truncate(NAME_LIMIT as usize);
    merged
}

/// Name search entry point / 名称检索入口
pub struct NameSearch<'a> {
    store: &'a TextStore,
    oracle: &'a dyn VoiceOracle,
    ctx: &'a SearchContext,
}

impl<'a> NameSearch<'a> {
    pub fn new(store: &'a TextStore, oracle: &'a dyn VoiceOracle, ctx: &'a SearchContext) -> Self {
        Self { store, oracle, ctx }
    }

    /// Quests by title, id and chapter, then documents by title and file name / 任务与阅读物名称检索
    pub async fn search(&self, keyword: &str, lang: LangCode) -> Result<NameSearchResult> {
        if keyword.trim().is_empty() {
            return Ok(NameSearchResult::default());
        }
        let keyword = keyword.trim();

        let quests = merge_quests(vec![
            self.quests_by_title(keyword, lang).await?,
            self.quests_by_id(keyword, lang).await?,
            self.quests_by_chapter(keyword, lang).await?,
        ]);

        let readables = match self.store.folder_code(lang).await? {
            Some(folder) => merge_readables(vec![
                self.readables_by_title(keyword, lang, &folder).await?,
                self.readables_by_file_name(keyword, lang, &folder).await?,
            ]),
            None => Vec::new(),
        };

        tracing::debug!(
            "Name search '{}' in lang {}: {} quests, {} readables",
            keyword,
            lang,
            quests.len(),
            readables.len()
        );
        Ok(NameSearchResult { quests, readables })
    }

    pub async fn quests_by_title(&self, keyword: &str, lang: LangCode) -> Result<Vec<QuestNameHit>> {
        let patterns = LikePatterns::build(keyword, lang);
        let mut qb = QueryBuilder::new(
            "SELECT quest.questId AS quest_id, textMap.content AS title, \
             NULL AS chapter_title, NULL AS chapter_num \
             FROM quest JOIN textMap ON quest.titleTextMapHash = textMap.hash \
             WHERE textMap.lang = ",
        );
        qb.push_bind(lang.0);
        push_match(&mut qb, "textMap.content", &patterns);
        qb.push(" ORDER BY ");
        push_exact_rank(&mut qb, "textMap.content", &patterns);
        qb.push(", length(textMap.content), quest.questId LIMIT ").push_bind(NAME_LIMIT);

        let rows = qb.build_query_as().fetch_all(self.store.pool()).await?;
        Ok(rows)
    }

    /// Quests whose decimal id contains `keyword` / 任务编号包含关键词
    pub async fn quests_by_id(&self, keyword: &str, lang: LangCode) -> Result<Vec<QuestNameHit>> {
        let mut qb = QueryBuilder::new(
            "SELECT quest.questId AS quest_id, textMap.content AS title, \
             NULL AS chapter_title, NULL AS chapter_num \
             FROM quest LEFT JOIN textMap ON quest.titleTextMapHash = textMap.hash AND textMap.lang = ",
        );
        qb.push_bind(lang.0)
            .push(" WHERE CAST(quest.questId AS TEXT) LIKE ")
            .push_bind(format!("%{}%", escape_like(keyword)))
            .push(" ESCAPE '\\' ORDER BY length(CAST(quest.questId AS TEXT)), quest.questId LIMIT ")
            .push_bind(NAME_LIMIT);

        let rows = qb.build_query_as().fetch_all(self.store.pool()).await?;
        Ok(rows)
    }

    /// Quests whose chapter title or number matches / 章节名称匹配的任务
    pub async fn quests_by_chapter(&self, keyword: &str, lang: LangCode) -> Result<Vec<QuestNameHit>> {
        let patterns = LikePatterns::build(keyword, lang);
        let mut qb = QueryBuilder::new(
            "SELECT quest.questId AS quest_id, questTitle.content AS title, \
             chapterTitle.content AS chapter_title, chapterNum.content AS chapter_num \
             FROM quest \
             JOIN textMap AS questTitle ON quest.titleTextMapHash = questTitle.hash \
             JOIN chapter ON quest.chapterId = chapter.chapterId \
             LEFT JOIN textMap AS chapterTitle ON chapter.chapterTitleTextMapHash = chapterTitle.hash AND chapterTitle.lang = ",
        );
        qb.push_bind(lang.0)
            .push(
                " LEFT JOIN textMap AS chapterNum ON chapter.chapterNumTextMapHash = chapterNum.hash \
                 AND chapterNum.lang = ",
            )
            .push_bind(lang.0)
            .push(" WHERE questTitle.lang = ")
            .push_bind(lang.0);
        push_match_any(&mut qb, &CHAPTER_COLUMNS, &patterns);

        qb.push(" ORDER BY CASE WHEN (");
        let mut separated = qb.separated(" OR ");
        for column in CHAPTER_COLUMNS {
            separated
                .push(column)
                .push_unseparated(" LIKE ")
                .push_bind_unseparated(patterns.exact.clone())
                .push_unseparated(" ESCAPE '\\'");
        }
        qb.push(") THEN 0 ELSE 1 END, length(coalesce(chapterTitle.content, chapterNum.content)), quest.questId LIMIT ")
            .push_bind(NAME_LIMIT);

        let rows = qb.build_query_as().fetch_all(self.store.pool()).await?;
        Ok(rows)
    }

    /// Documents in `folder` whose title matches / 标题匹配的阅读物
    pub async fn readables_by_title(&self, keyword: &str, lang: LangCode, folder: &str) -> Result<Vec<ReadableNameHit>> {
        let patterns = LikePatterns::build(keyword, lang);
        let mut qb = QueryBuilder::new(
            "SELECT readable.fileName AS file_name, readable.readableId AS readable_id, textMap.content AS title \
             FROM readable JOIN textMap ON readable.titleTextMapHash = textMap.hash \
             WHERE readable.lang = ",
        );
        qb.push_bind(folder.to_string())
            .push(" AND textMap.lang = ")
            .push_bind(lang.0);
        push_match(&mut qb, "textMap.content", &patterns);
        qb.push(" GROUP BY readable.fileName, readable.readableId, textMap.content ORDER BY ");
        push_exact_rank(&mut qb, "textMap.content", &patterns);
        qb.push(", length(textMap.content), readable.fileName LIMIT ").push_bind(NAME_LIMIT);

        let rows: Vec<ReadableNameRow> = qb.build_query_as().fetch_all(self.store.pool()).await?;
        Ok(rows.into_iter().map(ReadableNameHit::from).collect())
    }

    /// Documents in `folder` whose file name contains `keyword` / 文件名包含关键词的阅读物
    pub async fn readables_by_file_name(
        &self,
        keyword: &str,
        lang: LangCode,
        folder: &str,
    ) -> Result<Vec<ReadableNameHit>> {
        let mut qb = QueryBuilder::new(
            "SELECT readable.fileName AS file_name, readable.readableId AS readable_id, textMap.content AS title \
             FROM readable LEFT JOIN textMap ON readable.titleTextMapHash = textMap.hash AND textMap.lang = ",
        );
        qb.push_bind(lang.0)
            .push(" WHERE readable.lang = ")
            .push_bind(folder.to_string())
            .push(" AND readable.fileName LIKE ")
            .push_bind(format!("%{}%", escape_like(keyword)))
            .push(" ESCAPE '\\' ORDER BY length(readable.fileName), readable.fileName LIMIT ")
            .push_bind(NAME_LIMIT);

        let rows: Vec<ReadableNameRow> = qb.build_query_as().fetch_all(self.store.pool()).await?;
        Ok(rows.into_iter().map(ReadableNameHit::from).collect())
    }

    /// Playable characters by localized name / 按名称检索角色
    pub async fn avatars(&self, keyword: &str, lang: LangCode) -> Result<Vec<AvatarHit>> {
        if keyword.trim().is_empty() {
            return Ok(Vec::new());
        }
        let patterns = LikePatterns::build(keyword.trim(), lang);
        let mut qb = QueryBuilder::new(
            "SELECT avatar.avatarId AS avatar_id, textMap.content AS name \
             FROM avatar JOIN textMap ON avatar.nameTextMapHash = textMap.hash \
             WHERE textMap.lang = ",
        );
        qb.push_bind(lang.0);
        push_match(&mut qb, "textMap.content", &patterns);
        qb.push(" ORDER BY ");
        push_exact_rank(&mut qb, "textMap.content", &patterns);
        qb.push(", length(textMap.content), avatar.avatarId LIMIT ").push_bind(NAME_LIMIT);

        let rows = qb.build_query_as().fetch_all(self.store.pool()).await?;
        Ok(rows)
    }

    /// Voice lines of one character in fetter order / 角色语音列表
    ///
    /// Paths are kept only when the oracle confirms a clip in one of the result languages.
    pub async fn avatar_voices(&self, avatar_id: i64, search_lang: Option<LangCode>) -> Result<Vec<AvatarVoiceItem>> {
        let rows: Vec<AvatarVoiceRow> = sqlx::query_as(
            "SELECT fetters.fetterId AS fetter_id, fetters.voiceTitleTextMapHash AS title_hash, \
             fetters.voiceFileTextTextMapHash AS text_hash, voice.voicePath AS voice_path \
             FROM fetters \
             LEFT JOIN voice ON voice.dialogueId = fetters.voiceFile \
             AND (voice.avatarId = fetters.avatarId OR voice.avatarId = 0) \
             WHERE fetters.avatarId = ? \
             ORDER BY fetters.fetterId, voice.voicePath \
             LIMIT ?",
        )
        .bind(avatar_id)
        .bind(AVATAR_VOICE_LIMIT)
        .fetch_all(self.store.pool())
        .await?;

        let lang = search_lang.unwrap_or(self.ctx.source_language);
        let langs = self.ctx.languages_for(lang);

        let mut items: Vec<AvatarVoiceItem> = Vec::new();
        for row in rows {
            if items.last().map(|item| item.fetter_id) != Some(row.fetter_id) {
                let title = match row.title_hash {
                    Some(hash) => self.store.text_content(hash, lang).await?,
                    None => None,
                };
                let text = match row.text_hash {
                    Some(hash) => self.store.text_content(hash, lang).await?,
                    None => None,
                };
                items.push(AvatarVoiceItem {
                    fetter_id: row.fetter_id,
                    title,
                    text_hash: row.text_hash,
                    text,
                    voice_paths: Vec::new(),
                });
            }

            let Some(path) = row.voice_path else {
                continue;
            };
            let mut playable = false;
            for &l in &langs {
                if self.oracle.exists(&path, l).await {
                    playable = true;
                    break;
                }
            }
            if let Some(item) = items.last_mut() {
                if playable && !item.voice_paths.contains(&path) {
                    item.voice_paths.push(path);
                }
            }
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::voice::StaticVoiceOracle;
    use crate::store::fixtures;

    fn quest_ids(hits: &[QuestNameHit]) -> Vec<i64> {
        hits.iter().map(|h| h.quest_id).collect()
    }

    #[tokio::test]
    async fn test_blank_keyword_is_empty() {
        let store = TextStore::memory().await;
        fixtures::text(&store, 10, 1, "蒙德").await;
        fixtures::quest(&store, 1, 10, None, &[]).await;

        let oracle = StaticVoiceOracle::new();
        let ctx = SearchContext::default();
        let names = NameSearch::new(&store, &oracle, &ctx);
        let result = names.search("  ", LangCode::CHS).await.unwrap();
        assert!(result.quests.is_empty());
        assert!(result.readables.is_empty());
        assert!(names.avatars("", LangCode::CHS).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_quest_title_id_and_chapter_merge() {
        let store = TextStore::memory().await;
        fixtures::text(&store, 10, 1, "风起地的故事").await;
        fixtures::text(&store, 11, 1, "风起").await;
        fixtures::text(&store, 12, 1, "别的任务").await;
        fixtures::text(&store, 20, 1, "风与自由").await;
        fixtures::text(&store, 21, 1, "第一章").await;
        fixtures::chapter(&store, 5, 20, 21).await;
        fixtures::quest(&store, 301, 10, Some(5), &[]).await;
        fixtures::quest(&store, 302, 11, None, &[]).await;
        fixtures::quest(&store, 303, 12, Some(5), &[]).await;
        fixtures::quest(&store, 400, 12, None, &[]).await;

        let oracle = StaticVoiceOracle::new();
        let ctx = SearchContext::default();
        let names = NameSearch::new(&store, &oracle, &ctx);

        // Title hits come first, exact and shorter titles ahead; chapter hits follow.
        let result = names.search("风", LangCode::CHS).await.unwrap();
        assert_eq!(quest_ids(&result.quests), vec![302, 301, 303]);
        // A quest found by title keeps its chapter from the later chapter hit.
        assert_eq!(result.quests[1].chapter_title.as_deref(), Some("风与自由"));
        assert_eq!(result.quests[2].title.as_deref(), Some("别的任务"));

        let result = names.search("30", LangCode::CHS).await.unwrap();
        assert_eq!(quest_ids(&result.quests), vec![301, 302, 303]);

        let result = names.search("第一章", LangCode::CHS).await.unwrap();
        assert_eq!(quest_ids(&result.quests), vec![301, 303]);
        assert_eq!(result.quests[0].chapter_num.as_deref(), Some("第一章"));
    }

    #[tokio::test]
    async fn test_id_search_escapes_wildcards() {
        let store = TextStore::memory().await;
        fixtures::quest(&store, 1234, 10, None, &[]).await;

        let oracle = StaticVoiceOracle::new();
        let ctx = SearchContext::default();
        let names = NameSearch::new(&store, &oracle, &ctx);
        assert!(names.quests_by_id("%", LangCode::CHS).await.unwrap().is_empty());
        let hits = names.quests_by_id("23", LangCode::CHS).await.unwrap();
        assert_eq!(quest_ids(&hits), vec![1234]);
        assert_eq!(hits[0].title, None);
    }

    #[tokio::test]
    async fn test_readables_by_title_and_file_name() {
        let store = TextStore::memory().await;
        fixtures::text(&store, 30, 1, "提瓦特游记").await;
        fixtures::text(&store, 30, 4, "Teyvat Travel Book").await;
        fixtures::readable(&store, "Book7", "CHS", "正文", Some(30), Some(7)).await;
        fixtures::readable(&store, "Book7", "EN", "body", Some(30), Some(7)).await;
        fixtures::readable(&store, "Weapon11407", "CHS", "武器故事", None, None).await;

        let oracle = StaticVoiceOracle::new();
        let ctx = SearchContext::default();
        let names = NameSearch::new(&store, &oracle, &ctx);

        let result = names.search("游记", LangCode::CHS).await.unwrap();
        assert_eq!(result.readables.len(), 1);
        assert_eq!(result.readables[0].file_name, "Book7");
        assert_eq!(result.readables[0].readable_id, Some(7));
        assert_eq!(result.readables[0].category, "书籍");

        let result = names.search("Weapon", LangCode::CHS).await.unwrap();
        assert_eq!(result.readables.len(), 1);
        assert_eq!(result.readables[0].title, None);
        assert_eq!(result.readables[0].category, "武器");

        let result = names.search("Travel", LangCode::EN).await.unwrap();
        assert_eq!(result.readables.len(), 1);
        assert_eq!(result.readables[0].title.as_deref(), Some("Teyvat Travel Book"));
        // "Book7" matches both by title and by file name; listed once.
        let result = names.search("Book", LangCode::EN).await.unwrap();
        assert_eq!(result.readables.len(), 1);
    }

    #[tokio::test]
    async fn test_avatar_name_and_voices() {
        let store = TextStore::memory().await;
        fixtures::text(&store, 40, 1, "琴").await;
        fixtures::text(&store, 41, 1, "安柏").await;
        fixtures::avatar(&store, 10000003, 40).await;
        fixtures::avatar(&store, 10000021, 41).await;
        fixtures::text(&store, 50, 1, "初次见面").await;
        fixtures::text(&store, 51, 1, "我是琴。").await;
        fixtures::text(&store, 52, 1, "闲聊").await;
        fixtures::fetter(&store, 2, 10000003, 52, 53, 900).await;
        fixtures::fetter(&store, 1, 10000003, 50, 51, 800).await;
        fixtures::voice(&store, 800, "VO_jean_hello.wem", 10000003).await;
        fixtures::voice(&store, 800, "VO_jean_other.wem", 10000021).await;
        fixtures::voice(&store, 900, "VO_jean_chat.wem", 0).await;

        let oracle = StaticVoiceOracle::new().with_clip("VO_jean_hello.wem", LangCode::CHS, vec![1]);
        let ctx = SearchContext::default();
        let names = NameSearch::new(&store, &oracle, &ctx);

        let avatars = names.avatars("琴", LangCode::CHS).await.unwrap();
        assert_eq!(avatars, vec![AvatarHit { avatar_id: 10000003, name: "琴".to_string() }]);

        let voices = names.avatar_voices(10000003, Some(LangCode::CHS)).await.unwrap();
        assert_eq!(voices.len(), 2);
        assert_eq!(voices[0].fetter_id, 1);
        assert_eq!(voices[0].title.as_deref(), Some("初次见面"));
        assert_eq!(voices[0].text.as_deref(), Some("我是琴。"));
        // Another character's clip is not joined in.
        assert_eq!(voices[0].voice_paths, vec!["VO_jean_hello.wem".to_string()]);
        // Known path without an asset on disk is dropped.
        assert_eq!(voices[1].text, None);
        assert!(voices[1].voice_paths.is_empty());
    }
}
