use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::ApiResponse;
use crate::state::AppState;
use textmap_search::models::{LangCode, SearchPage, SearchQuery};
use textmap_search::search::{
    AvatarHit, AvatarVoiceItem, NameSearch, NameSearchResult, QuestDialogues, ReadableContent, SceneViews,
    SearchFacade, SubtitleContext, TalkView,
};

/// POST /api/keywordQuery - 关键词搜索
pub async fn keyword_query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchQuery>,
) -> Json<ApiResponse<SearchPage>> {
    let ctx = state.search_context();
    let voice = state.voice();
    let facade = SearchFacade::new(&state.store, voice.as_ref(), &ctx);
    Json(facade.search(&req).await.into())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TalkRequest {
    pub text_hash: i64,
    #[serde(default)]
    pub search_lang: Option<LangCode>,
}

/// POST /api/getTalkFromHash - 获取完整对话
pub async fn get_talk_from_hash(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TalkRequest>,
) -> Json<ApiResponse<TalkView>> {
    let ctx = state.search_context();
    let voice = state.voice();
    let views = SceneViews::new(&state.store, voice.as_ref(), &ctx);
    Json(views.talk(req.text_hash, req.search_lang).await.into())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleContextRequest {
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub subtitle_id: Option<i64>,
    #[serde(default)]
    pub search_lang: Option<LangCode>,
}

/// POST /api/getSubtitleContext - 获取字幕上下文
pub async fn get_subtitle_context(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubtitleContextRequest>,
) -> Json<ApiResponse<SubtitleContext>> {
    if req.file_name.is_none() && req.subtitle_id.is_none() {
        return Json(ApiResponse::error("缺少字幕文件名或编号"));
    }

    let ctx = state.search_context();
    let voice = state.voice();
    let views = SceneViews::new(&state.store, voice.as_ref(), &ctx);
    let result = views
        .subtitle_context(req.file_name.as_deref(), req.subtitle_id, req.search_lang)
        .await;
    Json(result.into())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadableRequest {
    #[serde(default)]
    pub readable_id: Option<i64>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub search_lang: Option<LangCode>,
}

/// POST /api/getReadableContent - 获取阅读物全文
pub async fn get_readable_content(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReadableRequest>,
) -> Json<ApiResponse<ReadableContent>> {
    if req.file_name.is_none() && req.readable_id.is_none() {
        return Json(ApiResponse::error("缺少阅读物文件名或编号"));
    }

    let ctx = state.search_context();
    let voice = state.voice();
    let views = SceneViews::new(&state.store, voice.as_ref(), &ctx);
    let result = views
        .readable(req.readable_id, req.file_name.as_deref(), req.search_lang)
        .await;
    Json(result.into())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestDialoguesRequest {
    pub quest_id: i64,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default)]
    pub page_size: i64,
    #[serde(default)]
    pub search_lang: Option<LangCode>,
}

fn default_page() -> i64 { 1 }

/// POST /api/getQuestDialogues - 任务对话分页
pub async fn get_quest_dialogues(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QuestDialoguesRequest>,
) -> Json<ApiResponse<QuestDialogues>> {
    let ctx = state.search_context();
    let voice = state.voice();
    let views = SceneViews::new(&state.store, voice.as_ref(), &ctx);
    let result = views
        .quest_dialogues(req.quest_id, req.page, req.page_size, req.search_lang)
        .await;
    Json(result.into())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameSearchRequest {
    pub lang_code: LangCode,
    pub keyword: String,
}

/// POST /api/nameSearch - 任务与阅读物名称检索
pub async fn name_search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NameSearchRequest>,
) -> Json<ApiResponse<NameSearchResult>> {
    let ctx = state.search_context();
    let voice = state.voice();
    let names = NameSearch::new(&state.store, voice.as_ref(), &ctx);
    Json(names.search(&req.keyword, req.lang_code).await.into())
}

/// POST /api/avatarSearch - 角色名称检索
pub async fn avatar_search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NameSearchRequest>,
) -> Json<ApiResponse<Vec<AvatarHit>>> {
    let ctx = state.search_context();
    let voice = state.voice();
    let names = NameSearch::new(&state.store, voice.as_ref(), &ctx);
    Json(names.avatars(&req.keyword, req.lang_code).await.into())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarVoiceRequest {
    pub avatar_id: i64,
    #[serde(default)]
    pub search_lang: Option<LangCode>,
}

/// POST /api/avatarVoice - 角色语音列表
pub async fn avatar_voice(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AvatarVoiceRequest>,
) -> Json<ApiResponse<Vec<AvatarVoiceItem>>> {
    let ctx = state.search_context();
    let voice = state.voice();
    let names = NameSearch::new(&state.store, voice.as_ref(), &ctx);
    Json(names.avatar_voices(req.avatar_id, req.search_lang).await.into())
}
