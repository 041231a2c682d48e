use axum::{
    extract::State,
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::ApiResponse;
use crate::state::AppState;
use textmap_search::models::LangCode;
use textmap_search::search::voice::voice_language_name;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceOverRequest {
    pub voice_path: String,
    pub lang_code: LangCode,
}

/// POST /api/getVoiceOver - 读取语音文件
///
/// Returns the raw clip; a missing clip answers with an empty body and `Error: True` / 语音不存在时返回 Error 头
pub async fn get_voice_over(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VoiceOverRequest>,
) -> Response {
    match state.voice().read(&req.voice_path, req.lang_code).await {
        Some(bytes) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "application/octet-stream")],
            bytes,
        )
            .into_response(),
        None => {
            tracing::debug!("Voice clip not found: {} ({})", req.voice_path, req.lang_code);
            (
                StatusCode::OK,
                [(HeaderName::from_static("error"), HeaderValue::from_static("True"))],
                Vec::<u8>::new(),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceLanguage {
    pub lang_code: LangCode,
    pub name: String,
}

/// GET /api/getImportedVoiceLanguages - 已加载的语音语言
pub async fn get_imported_voice_languages(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<Vec<VoiceLanguage>>> {
    let languages = state
        .voice()
        .loaded_languages()
        .into_iter()
        .filter_map(|lang| {
            voice_language_name(lang).map(|name| VoiceLanguage {
                lang_code: lang,
                name: name.to_string(),
            })
        })
        .collect();
    Json(ApiResponse::success(languages))
}
