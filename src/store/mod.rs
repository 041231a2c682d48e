//! Read-only text store / 只读文本库
//!
//! - One SQLite pool shared by every request; pooled connections make concurrent reads safe
//! - Point lookups (translations, talker names, quest titles, voice paths) live in `lookup`
//! - Per-language name caches are filled lazily and never invalidated (the store does not change while serving)

pub mod lookup;
pub mod schema;

use parking_lot::Mutex;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::collections::HashMap;

use crate::error::Result;
use crate::models::{LangCode, TalkerRole};

pub use lookup::{QuestDialogueRow, ReadableInfo, SubtitleLine};

/// SQL predicate: the text hash has at least one voice row / 存在语音记录的判断表达式
///
/// `field` must be a trusted column reference, never user input.
pub fn voice_exists_expr(field: &str) -> String {
    format!(
        "(exists (select 1 from dialogue vd join voice vv on vv.dialogueId = vd.dialogueId \
         where vd.textHash = {field} limit 1) \
         or exists (select 1 from fetters vf join voice vv on vv.dialogueId = vf.voiceFile \
         and (vv.avatarId = vf.avatarId or vv.avatarId = 0) \
         where vf.voiceFileTextTextMapHash = {field} limit 1))"
    )
}

/// Text store handle / 文本库句柄
pub struct TextStore {
    pool: SqlitePool,
    pseudo_names: Mutex<HashMap<(TalkerRole, LangCode), Vec<String>>>,
    wanderer_names: Mutex<HashMap<LangCode, Option<String>>>,
    folder_codes: Mutex<Option<HashMap<LangCode, String>>>,
}

impl TextStore {
    /// Open the store at `url` / 打开文本库
    pub async fn open(url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(url)
            .await?;

        // 设置busy_timeout，避免锁超时
        sqlx::query("PRAGMA busy_timeout=10000")
            .execute(&pool)
            .await?;

        tracing::info!("Text store opened: {}", url);
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            pseudo_names: Mutex::new(HashMap::new()),
            wanderer_names: Mutex::new(HashMap::new()),
            folder_codes: Mutex::new(None),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool / 关闭连接池
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Single-connection in-memory store with the schema applied / 内存测试库
    #[cfg(test)]
    pub async fn memory() -> Self {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        schema::ensure_schema(&pool).await.unwrap();
        Self::from_pool(pool)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Insert helpers shared by the store and search tests / 测试数据插入

    use super::TextStore;

    pub async fn text(store: &TextStore, hash: i64, lang: i64, content: &str) {
        sqlx::query("INSERT INTO textMap(hash, lang, content) VALUES (?, ?, ?)")
            .bind(hash)
            .bind(lang)
            .bind(content)
            .execute(store.pool())
            .await
            .unwrap();
    }

    pub async fn lang(store: &TextStore, id: i64, code: &str) {
        sqlx::query("INSERT INTO langCode(id, codeName, displayName, imported) VALUES (?, ?, ?, 1)")
            .bind(id)
            .bind(format!("TextMap{}.json", code))
            .bind(code)
            .execute(store.pool())
            .await
            .unwrap();
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn dialogue(
        store: &TextStore,
        dialogue_id: i64,
        talk_id: i64,
        talker_type: &str,
        talker_id: i64,
        text_hash: i64,
        coop_quest_id: Option<i64>,
    ) {
        sqlx::query(
            "INSERT INTO dialogue(dialogueId, talkerId, talkerType, talkId, textHash, coopQuestId) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(dialogue_id)
        .bind(talker_id)
        .bind(talker_type)
        .bind(talk_id)
        .bind(text_hash)
        .bind(coop_quest_id)
        .execute(store.pool())
        .await
        .unwrap();
    }

    pub async fn npc(store: &TextStore, npc_id: i64, name_hash: i64) {
        sqlx::query("INSERT INTO npc(npcId, textHash) VALUES (?, ?)")
            .bind(npc_id)
            .bind(name_hash)
            .execute(store.pool())
            .await
            .unwrap();
    }

    pub async fn avatar(store: &TextStore, avatar_id: i64, name_hash: i64) {
        sqlx::query("INSERT INTO avatar(avatarId, nameTextMapHash) VALUES (?, ?)")
            .bind(avatar_id)
            .bind(name_hash)
            .execute(store.pool())
            .await
            .unwrap();
    }

    pub async fn fetter(store: &TextStore, fetter_id: i64, avatar_id: i64, title_hash: i64, text_hash: i64, voice_file: i64) {
        sqlx::query(
            "INSERT INTO fetters(fetterId, avatarId, voiceTitleTextMapHash, voiceFileTextTextMapHash, voiceFile) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(fetter_id)
        .bind(avatar_id)
        .bind(title_hash)
        .bind(text_hash)
        .bind(voice_file)
        .execute(store.pool())
        .await
        .unwrap();
    }

    pub async fn voice(store: &TextStore, dialogue_id: i64, path: &str, avatar_id: i64) {
        sqlx::query("INSERT INTO voice(dialogueId, voicePath, gameTrigger, avatarId) VALUES (?, ?, 'Dialog', ?)")
            .bind(dialogue_id)
            .bind(path)
            .bind(avatar_id)
            .execute(store.pool())
            .await
            .unwrap();
    }

    pub async fn quest(store: &TextStore, quest_id: i64, title_hash: i64, chapter_id: Option<i64>, talks: &[i64]) {
        sqlx::query("INSERT INTO quest(questId, titleTextMapHash, chapterId) VALUES (?, ?, ?)")
            .bind(quest_id)
            .bind(title_hash)
            .bind(chapter_id)
            .execute(store.pool())
            .await
            .unwrap();
        for talk_id in talks {
            sqlx::query("INSERT INTO questTalk(questId, talkId) VALUES (?, ?)")
                .bind(quest_id)
                .bind(talk_id)
                .execute(store.pool())
                .await
                .unwrap();
        }
    }

    pub async fn chapter(store: &TextStore, chapter_id: i64, title_hash: i64, num_hash: i64) {
        sqlx::query("INSERT INTO chapter(chapterId, chapterTitleTextMapHash, chapterNumTextMapHash) VALUES (?, ?, ?)")
            .bind(chapter_id)
            .bind(title_hash)
            .bind(num_hash)
            .execute(store.pool())
            .await
            .unwrap();
    }

    pub async fn readable(
        store: &TextStore,
        file_name: &str,
        lang: &str,
        content: &str,
        title_hash: Option<i64>,
        readable_id: Option<i64>,
    ) {
        sqlx::query("INSERT INTO readable(fileName, lang, content, titleTextMapHash, readableId) VALUES (?, ?, ?, ?, ?)")
            .bind(file_name)
            .bind(lang)
            .bind(content)
            .bind(title_hash)
            .bind(readable_id)
            .execute(store.pool())
            .await
            .unwrap();
    }

    pub async fn subtitle(
        store: &TextStore,
        file_name: &str,
        lang: i64,
        start: f64,
        end: f64,
        content: &str,
        subtitle_id: Option<i64>,
    ) {
        sqlx::query("INSERT INTO subtitle(fileName, lang, startTime, endTime, content, subtitleId) VALUES (?, ?, ?, ?, ?, ?)")
            .bind(file_name)
            .bind(lang)
            .bind(start)
            .bind(end)
            .bind(content)
            .bind(subtitle_id)
            .execute(store.pool())
            .await
            .unwrap();
    }
}
