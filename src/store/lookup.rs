//! Point lookups against the text store / 文本库点查询

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite};
use std::collections::HashMap;

use super::{voice_exists_expr, TextStore};
use crate::error::Result;
use crate::models::{DialogueLine, FetterLine, LangCode, TalkerRole};

/// Talker name the game uses for the wanderer / 流浪者的占位名称
pub const WANDERER_PLACEHOLDER: &str = "#{REALNAME[ID(1)|HOSTONLY(true)]}";
const WANDERER_AVATAR_ID: i64 = 10000075;

/// Label used when a talk has no resolvable quest / 无任务时的来源名称
pub const DEFAULT_TALK_ORIGIN: &str = "对话文本";

static TEXTMAP_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^TextMap(.+)\.json$").expect("valid textmap regex"));

/// Document metadata / 阅读物信息
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReadableInfo {
    #[sqlx(rename = "fileName")]
    pub file_name: String,
    #[sqlx(rename = "titleTextMapHash")]
    pub title_hash: Option<i64>,
    #[sqlx(rename = "readableId")]
    pub readable_id: Option<i64>,
}

/// Subtitle line in some language / 字幕行
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleLine {
    pub content: String,
    pub lang: i64,
    #[sqlx(rename = "startTime")]
    pub start_time: f64,
    #[sqlx(rename = "endTime")]
    pub end_time: f64,
}

/// Dialogue line of a quest page / 任务对话行
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QuestDialogueRow {
    #[sqlx(rename = "textHash")]
    pub text_hash: i64,
    #[sqlx(rename = "talkerType")]
    pub talker_type: Option<String>,
    #[sqlx(rename = "talkerId")]
    pub talker_id: i64,
    #[sqlx(rename = "dialogueId")]
    pub dialogue_id: i64,
    #[sqlx(rename = "talkId")]
    pub talk_id: i64,
}

/// Push `(?, ?, ...)` binding every value / 追加 IN 列表
fn push_in_list<'a, T>(qb: &mut QueryBuilder<'a, Sqlite>, values: impl IntoIterator<Item = T>)
where
    T: 'a + Send + sqlx::Encode<'a, Sqlite> + sqlx::Type<Sqlite>,
{
    qb.push("(");
    let mut separated = qb.separated(", ");
    for value in values {
        separated.push_bind(value);
    }
    separated.push_unseparated(")");
}

impl TextStore {
    // ---- text entries ----

    /// Translations of one hash in the given languages / 查询多语言文本
    pub async fn translations(&self, hash: i64, langs: &[LangCode]) -> Result<Vec<(String, LangCode)>> {
        if langs.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT content, lang FROM textMap WHERE hash = ");
        qb.push_bind(hash);
        qb.push(" AND lang IN ");
        push_in_list(&mut qb, langs.iter().map(|l| l.0));
        qb.push(" ORDER BY lang");

        let rows: Vec<(String, i64)> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(content, lang)| (content, LangCode(lang))).collect())
    }

    pub async fn text_content(&self, hash: i64, lang: LangCode) -> Result<Option<String>> {
        let content = sqlx::query_scalar("SELECT content FROM textMap WHERE hash = ? AND lang = ?")
            .bind(hash)
            .bind(lang.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(content)
    }

    /// Whether any language has an entry for `hash` / 哈希是否存在
    pub async fn hash_exists(&self, hash: i64) -> Result<bool> {
        let row: Option<i64> = sqlx::query_scalar("SELECT 1 FROM textMap WHERE hash = ? LIMIT 1")
            .bind(hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Whether the entry in `lang` matches either pattern / 条目是否匹配关键词
    pub async fn text_matches(&self, hash: i64, lang: LangCode, exact: &str, fuzzy: &str) -> Result<bool> {
        let row: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM textMap WHERE hash = ? AND lang = ? \
             AND (content LIKE ? ESCAPE '\\' OR content LIKE ? ESCAPE '\\') LIMIT 1",
        )
        .bind(hash)
        .bind(lang.0)
        .bind(exact)
        .bind(fuzzy)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    /// Imported text languages / 已导入的文本语言
    pub async fn imported_langs(&self) -> Result<Vec<(LangCode, String)>> {
        let rows: Vec<(i64, String)> =
            sqlx::query_as("SELECT id, displayName FROM langCode WHERE imported = 1 ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(id, name)| (LangCode(id), name)).collect())
    }

    /// Folder code of the readable corpus for `lang` / 阅读物语言代码
    pub async fn folder_code(&self, lang: LangCode) -> Result<Option<String>> {
        let cached = self.folder_codes.lock().as_ref().map(|codes| codes.get(&lang).cloned());
        if let Some(code) = cached {
            return Ok(code.or_else(|| lang.folder_code().map(str::to_string)));
        }

        let rows: Vec<(i64, String)> = sqlx::query_as("SELECT id, codeName FROM langCode")
            .fetch_all(&self.pool)
            .await?;
        let codes: HashMap<LangCode, String> = rows
            .into_iter()
            .filter_map(|(id, name)| {
                TEXTMAP_FILE
                    .captures(&name)
                    .map(|caps| (LangCode(id), caps[1].to_string()))
            })
            .collect();

        let code = codes.get(&lang).cloned().or_else(|| lang.folder_code().map(str::to_string));
        *self.folder_codes.lock() = Some(codes);
        Ok(code)
    }

    // ---- voice ----

    pub async fn voice_path_in_dialogue(&self, text_hash: i64) -> Result<Option<String>> {
        let path = sqlx::query_scalar(
            "SELECT voice.voicePath FROM dialogue JOIN voice ON voice.dialogueId = dialogue.dialogueId \
             WHERE dialogue.textHash = ? ORDER BY dialogue.dialogueId, voice.voicePath LIMIT 1",
        )
        .bind(text_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(path)
    }

    pub async fn voice_path_in_fetter(&self, text_hash: i64) -> Result<Option<String>> {
        let path = sqlx::query_scalar(
            "SELECT voice.voicePath FROM fetters JOIN voice ON fetters.voiceFile = voice.dialogueId \
             AND (fetters.avatarId = voice.avatarId OR voice.avatarId = 0) \
             WHERE fetters.voiceFileTextTextMapHash = ? ORDER BY fetters.fetterId, voice.voicePath LIMIT 1",
        )
        .bind(text_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(path)
    }

    /// Whether a voice row exists for `text_hash`, regardless of assets / 是否有语音记录
    pub async fn has_voice_row(&self, text_hash: i64) -> Result<bool> {
        let sql = format!("SELECT 1 WHERE {}", voice_exists_expr("?"));
        let row: Option<i64> = sqlx::query_scalar(&sql)
            .bind(text_hash)
            .bind(text_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    // ---- talks and talkers ----

    /// First dialogue line carrying `text_hash` / 文本所属的对话
    pub async fn talk_info(&self, text_hash: i64) -> Result<Option<DialogueLine>> {
        let line = sqlx::query_as(
            "SELECT textHash, talkerType, talkerId, talkId, dialogueId, coopQuestId FROM dialogue \
             WHERE textHash = ? ORDER BY talkId, dialogueId LIMIT 1",
        )
        .bind(text_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(line)
    }

    /// All lines of a talk in dialogue order / 对话全部内容
    pub async fn talk_lines(&self, talk_id: i64, coop_quest_id: Option<i64>) -> Result<Vec<DialogueLine>> {
        let base = "SELECT textHash, talkerType, talkerId, talkId, dialogueId, coopQuestId FROM dialogue WHERE talkId = ?";
        let lines = match coop_quest_id {
            None => {
                sqlx::query_as(&format!("{} AND coopQuestId IS NULL ORDER BY dialogueId", base))
                    .bind(talk_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            Some(coop) => {
                sqlx::query_as(&format!("{} AND coopQuestId = ? ORDER BY dialogueId", base))
                    .bind(talk_id)
                    .bind(coop)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(lines)
    }

    pub async fn avatar_name(&self, avatar_id: i64, lang: LangCode) -> Result<Option<String>> {
        let name = sqlx::query_scalar(
            "SELECT content FROM avatar JOIN textMap ON avatar.nameTextMapHash = textMap.hash \
             WHERE avatar.avatarId = ? AND textMap.lang = ?",
        )
        .bind(avatar_id)
        .bind(lang.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(name)
    }

    pub async fn npc_name(&self, npc_id: i64, lang: LangCode) -> Result<Option<String>> {
        let name = sqlx::query_scalar(
            "SELECT content FROM npc JOIN textMap ON npc.textHash = textMap.hash \
             WHERE npc.npcId = ? AND textMap.lang = ?",
        )
        .bind(npc_id)
        .bind(lang.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(name)
    }

    /// Localized name of the wanderer, cached / 流浪者名称
    pub async fn wanderer_name(&self, lang: LangCode) -> Result<Option<String>> {
        let cached = self.wanderer_names.lock().get(&lang).cloned();
        if let Some(name) = cached {
            return Ok(name);
        }
        let name = self.avatar_name(WANDERER_AVATAR_ID, lang).await?;
        self.wanderer_names.lock().insert(lang, name.clone());
        Ok(name)
    }

    /// Display name of a talker / 说话者名称
    pub async fn talker_name(&self, role: &TalkerRole, talker_id: i64, lang: LangCode) -> Result<Option<String>> {
        let name = match role {
            TalkerRole::Npc => self.npc_name(talker_id, lang).await?,
            TalkerRole::Player | TalkerRole::MateAvatar => role.fixed_label().map(str::to_string),
            TalkerRole::Other(_) => None,
        };

        match name {
            Some(n) if n == WANDERER_PLACEHOLDER => self.wanderer_name(lang).await,
            other => Ok(other),
        }
    }

    /// Talker of any line carrying `text_hash` (dialogue first, then fetter) / 文本的说话者
    pub async fn talker_name_for_hash(&self, text_hash: i64, lang: LangCode) -> Result<Option<String>> {
        if let Some(line) = self.talk_info(text_hash).await? {
            if let Some(name) = self.talker_name(&line.role(), line.talker_id, lang).await? {
                return Ok(Some(name));
            }
        }

        let avatar: Option<i64> =
            sqlx::query_scalar("SELECT avatarId FROM fetters WHERE voiceFileTextTextMapHash = ? ORDER BY fetterId LIMIT 1")
                .bind(text_hash)
                .fetch_optional(&self.pool)
                .await?;
        match avatar {
            Some(avatar_id) => self.avatar_name(avatar_id, lang).await,
            None => Ok(None),
        }
    }

    /// Localized names a pseudo speaker answers to, cached per language / 伪说话者名称
    pub async fn pseudo_speaker_names(&self, role: &TalkerRole, lang: LangCode) -> Result<Vec<String>> {
        let key = (role.clone(), lang);
        let cached = self.pseudo_names.lock().get(&key).cloned();
        if let Some(names) = cached {
            return Ok(names);
        }

        let mut names: Vec<String> = role.fixed_label().map(str::to_string).into_iter().collect();
        if let Some(avatar_id) = role.avatar_id() {
            if let Some(name) = self.avatar_name(avatar_id, lang).await? {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }

        tracing::debug!("Pseudo speaker {:?} in lang {} resolved to {:?}", role, lang, names);
        self.pseudo_names.lock().insert(key, names.clone());
        Ok(names)
    }

    // ---- quests ----

    pub async fn quest_id_for_talk(&self, talk_id: i64) -> Result<Option<i64>> {
        let id = sqlx::query_scalar(
            "SELECT quest.questId FROM questTalk JOIN quest ON quest.questId = questTalk.questId \
             WHERE questTalk.talkId = ? ORDER BY quest.questId LIMIT 1",
        )
        .bind(talk_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    /// `chapterNum · chapterTitle · questTitle`, shortened when parts are missing / 任务完整名称
    pub async fn quest_name(&self, quest_id: i64, lang: LangCode) -> Result<String> {
        let title: Option<String> = sqlx::query_scalar(
            "SELECT content FROM quest JOIN textMap ON quest.titleTextMapHash = textMap.hash \
             WHERE quest.questId = ? AND textMap.lang = ?",
        )
        .bind(quest_id)
        .bind(lang.0)
        .fetch_optional(&self.pool)
        .await?;
        let Some(title) = title else {
            return Ok(DEFAULT_TALK_ORIGIN.to_string());
        };

        match self.quest_chapter_name(quest_id, lang).await? {
            Some(chapter) => Ok(format!("{} · {}", chapter, title)),
            None => Ok(title),
        }
    }

    /// `chapterNum · chapterTitle` or just the title / 章节名称
    pub async fn quest_chapter_name(&self, quest_id: i64, lang: LangCode) -> Result<Option<String>> {
        let hashes: Option<(Option<i64>, Option<i64>)> = sqlx::query_as(
            "SELECT chapter.chapterTitleTextMapHash, chapter.chapterNumTextMapHash FROM quest \
             JOIN chapter ON quest.chapterId = chapter.chapterId WHERE quest.questId = ?",
        )
        .bind(quest_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some((Some(title_hash), num_hash)) = hashes else {
            return Ok(None);
        };

        let Some(chapter_title) = self.text_content(title_hash, lang).await? else {
            return Ok(None);
        };
        let chapter_num = match num_hash {
            Some(hash) => self.text_content(hash, lang).await?,
            None => None,
        };

        Ok(Some(match chapter_num {
            Some(num) => format!("{} · {}", num, chapter_title),
            None => chapter_title,
        }))
    }

    pub async fn talk_quest_name(&self, talk_id: i64, lang: LangCode) -> Result<String> {
        match self.quest_id_for_talk(talk_id).await? {
            Some(quest_id) => self.quest_name(quest_id, lang).await,
            None => Ok(DEFAULT_TALK_ORIGIN.to_string()),
        }
    }

    /// Co-op talks are keyed by `questId * 100 + n` / 邀约任务名称
    pub async fn coop_quest_name(&self, coop_quest_id: i64, lang: LangCode) -> Result<String> {
        self.quest_name(coop_quest_id / 100, lang).await
    }

    /// Quest name of the scene a dialogue line belongs to / 对话所属任务名称
    pub async fn scene_name(&self, line: &DialogueLine, lang: LangCode) -> Result<String> {
        match line.coop_quest_id {
            Some(coop) => self.coop_quest_name(coop, lang).await,
            None => self.talk_quest_name(line.talk_id, lang).await,
        }
    }

    /// `talker, quest` for dialogue text / 对话文本来源
    pub async fn origin_from_dialogue(&self, text_hash: i64, lang: LangCode) -> Result<Option<String>> {
        let Some(line) = self.talk_info(text_hash).await? else {
            return Ok(None);
        };
        let talker = self.talker_name(&line.role(), line.talker_id, lang).await?;
        let quest = self.scene_name(&line, lang).await?;
        Ok(Some(match talker {
            Some(name) => format!("{}, {}", name, quest),
            None => quest,
        }))
    }

    /// `avatar · voice title` for character voice lines / 角色语音来源
    pub async fn origin_from_fetter(&self, text_hash: i64, lang: LangCode) -> Result<Option<String>> {
        let line: Option<FetterLine> = sqlx::query_as(
            "SELECT fetters.fetterId AS fetterId, fetters.avatarId AS avatarId, textMap.content AS title FROM fetters \
             JOIN textMap ON fetters.voiceTitleTextMapHash = textMap.hash \
             WHERE fetters.voiceFileTextTextMapHash = ? AND textMap.lang = ? ORDER BY fetters.fetterId LIMIT 1",
        )
        .bind(text_hash)
        .bind(lang.0)
        .fetch_optional(&self.pool)
        .await?;
        let Some(line) = line else {
            return Ok(None);
        };
        Ok(self
            .avatar_name(line.avatar_id, lang)
            .await?
            .map(|name| format!("{} · {}", name, line.title)))
    }

    pub async fn count_quest_dialogues(&self, quest_id: i64) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT count(*) FROM dialogue d \
             JOIN (SELECT DISTINCT talkId FROM questTalk WHERE questId = ?) qt ON qt.talkId = d.talkId \
             WHERE d.coopQuestId IS NULL",
        )
        .bind(quest_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.max(0) as u64)
    }

    pub async fn quest_dialogues_page(&self, quest_id: i64, limit: u64, offset: u64) -> Result<Vec<QuestDialogueRow>> {
        let rows = sqlx::query_as(
            "SELECT d.textHash AS textHash, d.talkerType AS talkerType, d.talkerId AS talkerId, \
             d.dialogueId AS dialogueId, d.talkId AS talkId FROM dialogue d \
             JOIN (SELECT DISTINCT talkId FROM questTalk WHERE questId = ?) qt ON qt.talkId = d.talkId \
             WHERE d.coopQuestId IS NULL ORDER BY d.talkId, d.dialogueId LIMIT ? OFFSET ?",
        )
        .bind(quest_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // ---- readables ----

    pub async fn readable_info(&self, readable_id: Option<i64>, file_name: Option<&str>) -> Result<Option<ReadableInfo>> {
        let base = "SELECT fileName, titleTextMapHash, readableId FROM readable";
        let info = if let Some(id) = readable_id {
            sqlx::query_as(&format!("{} WHERE readableId = ? ORDER BY fileName LIMIT 1", base))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
        } else if let Some(name) = file_name {
            sqlx::query_as(&format!("{} WHERE fileName = ? ORDER BY lang LIMIT 1", base))
                .bind(name)
                .fetch_optional(&self.pool)
                .await?
        } else {
            None
        };
        Ok(info)
    }

    /// Readable texts by id (or file name when `readable_id` is None) in folder codes / 阅读物多语言内容
    pub async fn readable_translations(
        &self,
        readable_id: Option<i64>,
        file_name: &str,
        codes: &[String],
    ) -> Result<Vec<(String, String)>> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT content, lang FROM readable WHERE ");
        match readable_id {
            Some(id) => {
                qb.push("readableId = ").push_bind(id);
            }
            None => {
                qb.push("fileName = ").push_bind(file_name.to_string());
            }
        }
        qb.push(" AND lang IN ");
        push_in_list(&mut qb, codes.iter().cloned());
        qb.push(" ORDER BY lang, fileName");

        let rows = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    // ---- subtitles ----

    /// Lines of the same subtitle within ±0.5 s of `start_time` / 同时间段的字幕翻译
    pub async fn subtitle_translations(
        &self,
        subtitle_id: Option<i64>,
        file_name: &str,
        start_time: f64,
        langs: &[LangCode],
    ) -> Result<Vec<(String, LangCode)>> {
        if langs.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT content, lang FROM subtitle WHERE ");
        match subtitle_id {
            Some(id) => {
                qb.push("subtitleId = ").push_bind(id);
            }
            None => {
                qb.push("fileName = ").push_bind(file_name.to_string());
            }
        }
        qb.push(" AND lang IN ");
        push_in_list(&mut qb, langs.iter().map(|l| l.0));
        qb.push(" AND abs(startTime - ").push_bind(start_time).push(") < 0.5");
        qb.push(" ORDER BY lang, abs(startTime - ").push_bind(start_time).push(")");

        let rows: Vec<(String, i64)> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(content, lang)| (content, LangCode(lang))).collect())
    }

    /// Every line of one subtitle file in the given languages / 字幕文件全部内容
    pub async fn subtitle_lines(
        &self,
        subtitle_id: Option<i64>,
        file_name: Option<&str>,
        langs: &[LangCode],
    ) -> Result<Vec<SubtitleLine>> {
        if langs.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT content, lang, startTime, endTime FROM subtitle WHERE ");
        match (subtitle_id, file_name) {
            (Some(id), _) => {
                qb.push("subtitleId = ").push_bind(id);
            }
            (None, Some(name)) => {
                qb.push("fileName = ").push_bind(name.to_string());
            }
            (None, None) => return Ok(Vec::new()),
        }
        qb.push(" AND lang IN ");
        push_in_list(&mut qb, langs.iter().map(|l| l.0));
        qb.push(" ORDER BY startTime, lang");

        let rows = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows)
    }
}
