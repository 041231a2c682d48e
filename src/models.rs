//! Data model shared by the store, the search engine and the route layer / 数据模型

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Language id as stored in `textMap.lang` / 语言编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LangCode(pub i64);

impl LangCode {
    pub const CHS: LangCode = LangCode(1);
    pub const CHT: LangCode = LangCode(2);
    pub const EN: LangCode = LangCode(4);
    pub const JP: LangCode = LangCode(9);
    pub const KR: LangCode = LangCode(10);

    /// Whitespace is insignificant in logographic text / 表意文字语言（空白无意义）
    pub fn is_logographic(self) -> bool {
        matches!(self, LangCode::CHS | LangCode::CHT)
    }

    /// Folder code used by the readable corpus, e.g. `CHS` / 阅读物语言目录代码
    pub fn folder_code(self) -> Option<&'static str> {
        let code = match self.0 {
            1 => "CHS",
            2 => "CHT",
            3 => "DE",
            4 => "EN",
            5 => "ES",
            6 => "FR",
            7 => "ID",
            8 => "IT",
            9 => "JP",
            10 => "KR",
            11 => "PT",
            12 => "RU",
            13 => "TH",
            14 => "TR",
            15 => "VI",
            _ => return None,
        };
        Some(code)
    }
}

impl fmt::Display for LangCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Speaker role of a dialogue line / 对话说话者类型
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TalkerRole {
    Npc,
    Player,
    /// The player's twin / 反主
    MateAvatar,
    Other(String),
}

impl TalkerRole {
    /// Roles that are matched by display name instead of a foreign key / 伪说话者
    pub const PSEUDO: [TalkerRole; 2] = [TalkerRole::Player, TalkerRole::MateAvatar];

    pub fn from_db(raw: Option<&str>) -> Self {
        match raw {
            Some("TALK_ROLE_NPC") => TalkerRole::Npc,
            Some("TALK_ROLE_PLAYER") => TalkerRole::Player,
            Some("TALK_ROLE_MATE_AVATAR") => TalkerRole::MateAvatar,
            Some(other) => TalkerRole::Other(other.to_string()),
            None => TalkerRole::Other(String::new()),
        }
    }

    pub fn as_db(&self) -> &str {
        match self {
            TalkerRole::Npc => "TALK_ROLE_NPC",
            TalkerRole::Player => "TALK_ROLE_PLAYER",
            TalkerRole::MateAvatar => "TALK_ROLE_MATE_AVATAR",
            TalkerRole::Other(raw) => raw,
        }
    }

    /// Fixed label shown for pseudo speakers / 伪说话者固定名称
    pub fn fixed_label(&self) -> Option<&'static str> {
        match self {
            TalkerRole::Player => Some("主角"),
            TalkerRole::MateAvatar => Some("反主"),
            _ => None,
        }
    }

    /// Avatar whose localized name also identifies this pseudo speaker / 对应角色ID
    pub fn avatar_id(&self) -> Option<i64> {
        match self {
            TalkerRole::Player => Some(10000005),
            TalkerRole::MateAvatar => Some(10000007),
            _ => None,
        }
    }
}

/// One row of `dialogue` / 对话行
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DialogueLine {
    #[sqlx(rename = "textHash")]
    pub text_hash: i64,
    #[sqlx(rename = "talkerType")]
    pub talker_type: Option<String>,
    #[sqlx(rename = "talkerId")]
    pub talker_id: i64,
    #[sqlx(rename = "talkId")]
    pub talk_id: i64,
    #[sqlx(rename = "dialogueId")]
    pub dialogue_id: i64,
    #[sqlx(rename = "coopQuestId")]
    pub coop_quest_id: Option<i64>,
}

impl DialogueLine {
    pub fn role(&self) -> TalkerRole {
        TalkerRole::from_db(self.talker_type.as_deref())
    }
}

/// Character voice line (`fetters`) with its localized title / 角色语音行
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FetterLine {
    #[sqlx(rename = "fetterId")]
    pub fetter_id: i64,
    #[sqlx(rename = "avatarId")]
    pub avatar_id: i64,
    pub title: String,
}

/// Text entry hit from the textMap corpus / 文本条目命中
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TextRow {
    pub hash: i64,
    pub content: String,
}

/// Text hit with the store-level voice flag, for in-memory ranking / 带语音标记的文本命中
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RankedTextRow {
    pub hash: i64,
    pub content: String,
    /// A dialogue or fetter voice row exists for the hash / 存在语音记录
    pub voiced: bool,
}

/// Document ("readable") hit / 阅读物命中
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DocumentRow {
    #[sqlx(rename = "fileName")]
    pub file_name: String,
    pub content: String,
    #[sqlx(rename = "titleTextMapHash")]
    pub title_hash: Option<i64>,
    #[sqlx(rename = "readableId")]
    pub readable_id: Option<i64>,
}

/// Subtitle hit / 字幕命中
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubtitleRow {
    #[sqlx(rename = "fileName")]
    pub file_name: String,
    pub content: String,
    #[sqlx(rename = "startTime")]
    pub start_time: f64,
    #[sqlx(rename = "endTime")]
    pub end_time: f64,
    #[sqlx(rename = "subtitleId")]
    pub subtitle_id: Option<i64>,
}

/// Which corpus produced a result / 结果来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    Text,
    Document,
    Subtitle,
}

/// Search result DTO returned to the route layer / 搜索结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub hash: i64,
    pub translates: BTreeMap<LangCode, String>,
    pub voice_paths: Vec<String>,
    pub origin: String,
    pub is_talk: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub talker: Option<String>,
    pub source: ResultSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readable_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialogue_id: Option<i64>,
    /// Set when the keyword literally named this hash / 关键词即为该哈希
    #[serde(skip)]
    pub pinned: bool,
}

impl SearchResult {
    pub fn new(hash: i64, source: ResultSource) -> Self {
        Self {
            hash,
            translates: BTreeMap::new(),
            voice_paths: Vec::new(),
            origin: String::new(),
            is_talk: false,
            talker: None,
            source,
            file_name: None,
            readable_id: None,
            subtitle_id: None,
            start_time: None,
            end_time: None,
            dialogue_id: None,
            pinned: false,
        }
    }

    /// Text in the given language, if translated / 指定语言的文本
    pub fn text_in(&self, lang: LangCode) -> Option<&str> {
        self.translates.get(&lang).map(String::as_str)
    }

    pub fn has_voice(&self) -> bool {
        !self.voice_paths.is_empty()
    }
}

/// Voice presence filter / 语音筛选
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceFilter {
    #[default]
    All,
    With,
    Without,
}

/// Keyword query as received from the route layer / 关键词查询
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[serde(default)]
    pub keyword: String,
    pub lang_code: LangCode,
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default)]
    pub page_size: i64,
    #[serde(default)]
    pub voice_filter: VoiceFilter,
}

fn default_page() -> i64 { 1 }

impl SearchQuery {
    pub fn new(keyword: impl Into<String>, lang_code: LangCode) -> Self {
        Self {
            keyword: keyword.into(),
            lang_code,
            speaker: None,
            page: 1,
            page_size: 0,
            voice_filter: VoiceFilter::All,
        }
    }

    pub fn with_speaker(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = Some(speaker.into());
        self
    }

    pub fn with_page(mut self, page: i64, page_size: i64) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    pub fn with_voice_filter(mut self, filter: VoiceFilter) -> Self {
        self.voice_filter = filter;
        self
    }
}

/// One page of search results / 一页搜索结果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchPage {
    pub contents: Vec<SearchResult>,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_talker_role_round_trip() {
        for raw in ["TALK_ROLE_NPC", "TALK_ROLE_PLAYER", "TALK_ROLE_MATE_AVATAR", "TALK_ROLE_GADGET"] {
            assert_eq!(TalkerRole::from_db(Some(raw)).as_db(), raw);
        }
        assert_eq!(TalkerRole::from_db(Some("TALK_ROLE_GADGET")), TalkerRole::Other("TALK_ROLE_GADGET".into()));
    }

    #[test]
    fn test_search_result_serializes_camel_case() {
        let mut result = SearchResult::new(42, ResultSource::Text);
        result.translates.insert(LangCode::CHS, "你好".into());
        result.voice_paths.push("VO_a.wem".into());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["hash"], 42);
        assert_eq!(json["translates"]["1"], "你好");
        assert_eq!(json["voicePaths"][0], "VO_a.wem");
        assert_eq!(json["isTalk"], false);
        assert!(json.get("talker").is_none());
        assert!(json.get("pinned").is_none());
    }

    #[test]
    fn test_query_defaults() {
        let query: SearchQuery = serde_json::from_str(r#"{"keyword":"a","langCode":4}"#).unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.voice_filter, VoiceFilter::All);
        assert_eq!(query.lang_code, LangCode::EN);
        let query: SearchQuery =
            serde_json::from_str(r#"{"keyword":"a","langCode":1,"voiceFilter":"without"}"#).unwrap();
        assert_eq!(query.voice_filter, VoiceFilter::Without);
    }
}
