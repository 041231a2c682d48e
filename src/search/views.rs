//! Context views around a search hit / 搜索结果的上下文视图
//!
//! Whole scenes, whole subtitle files, whole documents and the dialogue of a quest.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{Result, SearchError};
use crate::models::{LangCode, SearchResult, TalkerRole};
use crate::search::context::SearchContext;
use crate::search::paginator::page_offset;
use crate::search::results::{DocumentCategory, ResultBuilder};
use crate::search::voice::VoiceOracle;
use crate::store::{SubtitleLine, TextStore};

/// Maximum start-time distance inside one subtitle cluster, in seconds / 字幕聚类时间窗口
pub const CLUSTER_WINDOW: f64 = 0.5;

/// One scene / 对话场景
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TalkView {
    pub talk_quest_name: String,
    pub talk_id: i64,
    pub dialogues: Vec<SearchResult>,
}

/// Subtitle lines of several languages starting at about the same time / 字幕聚类
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleCluster {
    pub start_time: f64,
    pub end_time: f64,
    pub translates: BTreeMap<LangCode, String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle_id: Option<i64>,
    pub clusters: Vec<SubtitleCluster>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadableContent {
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readable_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub category: String,
    pub translates: BTreeMap<LangCode, String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestDialogues {
    pub quest_id: i64,
    pub quest_name: String,
    pub total: u64,
    pub dialogues: Vec<SearchResult>,
}

/// Group time-ordered lines; each cluster holds one line per language / 按时间聚类字幕
pub fn cluster_subtitles(lines: Vec<SubtitleLine>) -> Vec<SubtitleCluster> {
    let mut clusters: Vec<SubtitleCluster> = Vec::new();
    for line in lines {
        let lang = LangCode(line.lang);
        match clusters.last_mut() {
            Some(cluster)
                if (line.start_time - cluster.start_time).abs() < CLUSTER_WINDOW
                    && !cluster.translates.contains_key(&lang) =>
            {
                cluster.end_time = cluster.end_time.max(line.end_time);
                cluster.translates.insert(lang, line.content);
            }
            _ => {
                let mut translates = BTreeMap::new();
                translates.insert(lang, line.content);
                clusters.push(SubtitleCluster {
                    start_time: line.start_time,
                    end_time: line.end_time,
                    translates,
                });
            }
        }
    }
    clusters
}

/// View builder / 视图构建
pub struct SceneViews<'a> {
    store: &'a TextStore,
    oracle: &'a dyn VoiceOracle,
    ctx: &'a SearchContext,
}

impl<'a> SceneViews<'a> {
    pub fn new(store: &'a TextStore, oracle: &'a dyn VoiceOracle, ctx: &'a SearchContext) -> Self {
        Self { store, oracle, ctx }
    }

    fn builder(&self, search_lang: Option<LangCode>) -> ResultBuilder<'a> {
        let lang = search_lang.unwrap_or(self.ctx.source_language);
        ResultBuilder::new(self.store, self.oracle, self.ctx, lang)
    }

    /// The scene containing `text_hash` / 文本所属的完整对话
    pub async fn talk(&self, text_hash: i64, search_lang: Option<LangCode>) -> Result<TalkView> {
        let Some(info) = self.store.talk_info(text_hash).await? else {
            return Err(SearchError::not_found("内容不属于任何对话！"));
        };

        let source_lang = self.ctx.source_language;
        let talk_quest_name = self.store.scene_name(&info, source_lang).await?;
        let builder = self.builder(search_lang);

        let lines = self.store.talk_lines(info.talk_id, info.coop_quest_id).await?;
        let mut dialogues = Vec::with_capacity(lines.len());
        for line in lines {
            let mut result = builder.text_without_origin(line.text_hash).await?;
            result.talker = self.store.talker_name(&line.role(), line.talker_id, source_lang).await?;
            result.dialogue_id = Some(line.dialogue_id);
            result.is_talk = true;
            dialogues.push(result);
        }

        Ok(TalkView {
            talk_quest_name,
            talk_id: info.talk_id,
            dialogues,
        })
    }

    /// Every line of one subtitle file, clustered / 字幕文件上下文
    pub async fn subtitle_context(
        &self,
        file_name: Option<&str>,
        subtitle_id: Option<i64>,
        search_lang: Option<LangCode>,
    ) -> Result<SubtitleContext> {
        let langs = self.builder(search_lang).languages().to_vec();
        let lines = self.store.subtitle_lines(subtitle_id, file_name, &langs).await?;
        if lines.is_empty() {
            return Err(SearchError::not_found("未找到字幕内容"));
        }

        Ok(SubtitleContext {
            file_name: file_name.map(str::to_string),
            subtitle_id,
            clusters: cluster_subtitles(lines),
        })
    }

    /// Full localized text of one document / 阅读物全文
    pub async fn readable(
        &self,
        readable_id: Option<i64>,
        file_name: Option<&str>,
        search_lang: Option<LangCode>,
    ) -> Result<ReadableContent> {
        let Some(info) = self.store.readable_info(readable_id, file_name).await? else {
            return Err(SearchError::not_found("未找到阅读物"));
        };

        let mut codes = Vec::new();
        for &lang in self.builder(search_lang).languages() {
            if let Some(code) = self.store.folder_code(lang).await? {
                codes.push((code, lang));
            }
        }
        let folders: Vec<String> = codes.iter().map(|(code, _)| code.clone()).collect();

        let mut translates = BTreeMap::new();
        for (content, folder) in self
            .store
            .readable_translations(info.readable_id, &info.file_name, &folders)
            .await?
        {
            if let Some((_, lang)) = codes.iter().find(|(code, _)| *code == folder) {
                translates.entry(*lang).or_insert(content);
            }
        }

        let title = match info.title_hash {
            Some(hash) => self.store.text_content(hash, self.ctx.source_language).await?,
            None => None,
        };

        Ok(ReadableContent {
            category: DocumentCategory::from_file_name(&info.file_name).label().to_string(),
            file_name: info.file_name,
            readable_id: info.readable_id,
            title,
            translates,
        })
    }

    /// One page of a quest's dialogue lines / 任务对话分页
    pub async fn quest_dialogues(
        &self,
        quest_id: i64,
        page: i64,
        page_size: i64,
        search_lang: Option<LangCode>,
    ) -> Result<QuestDialogues> {
        let page = page.max(1) as u64;
        let page_size = if page_size < 1 {
            u64::from(self.ctx.default_page_size)
        } else {
            page_size as u64
        };

        let source_lang = self.ctx.source_language;
        let quest_name = self.store.quest_name(quest_id, source_lang).await?;
        let total = self.store.count_quest_dialogues(quest_id).await?;
        let rows = self
            .store
            .quest_dialogues_page(quest_id, page_size, page_offset(page, page_size))
            .await?;

        let builder = self.builder(search_lang);
        let mut dialogues = Vec::with_capacity(rows.len());
        for row in rows {
            let role = TalkerRole::from_db(row.talker_type.as_deref());
            let mut result = builder.text_without_origin(row.text_hash).await?;
            result.talker = self.store.talker_name(&role, row.talker_id, source_lang).await?;
            result.dialogue_id = Some(row.dialogue_id);
            result.is_talk = true;
            dialogues.push(result);
        }

        Ok(QuestDialogues {
            quest_id,
            quest_name,
            total,
            dialogues,
        })
    }
}
