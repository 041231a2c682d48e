use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::ApiResponse;
use crate::state::AppState;
use textmap_search::config::{save_config, AppConfig, GenderPreference, SearchConfig};
use textmap_search::models::LangCode;
use textmap_search::search::{DirectoryVoiceOracle, VoiceOracle};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    pub search: SearchConfig,
    pub asset_dir: String,
    pub asset_dir_valid: bool,
}

/// GET /api/getSettings - 获取设置
pub async fn get_settings(State(state): State<Arc<AppState>>) -> Json<ApiResponse<SettingsView>> {
    let config = state.config.read();
    Json(ApiResponse::success(SettingsView {
        search: config.search.clone(),
        asset_dir: config.voice.asset_dir.clone(),
        asset_dir_valid: config.is_asset_dir_valid(),
    }))
}

/// Partial update; absent fields keep their value / 部分更新
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSettingsRequest {
    pub result_languages: Option<Vec<LangCode>>,
    pub default_search_language: Option<LangCode>,
    pub source_language: Option<LangCode>,
    pub is_male: Option<GenderPreference>,
    pub default_page_size: Option<u32>,
    pub missing_text_sorts_first: Option<bool>,
    pub asset_dir: Option<String>,
}

/// POST /api/saveSettings - 保存设置
pub async fn save_settings(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SaveSettingsRequest>,
) -> Json<ApiResponse<()>> {
    match commit_settings(&state, req, save_config).await {
        Ok(()) => {
            tracing::info!("Settings saved");
            Json(ApiResponse::success(()))
        }
        Err(e) => {
            tracing::error!("Failed to save settings: {}", e);
            Json(ApiResponse::error(&e))
        }
    }
}

/// Apply `req` to a copy of the live config, persist it, then publish it / 先持久化再生效
///
/// The live config and voice oracle are left untouched when `persist` fails.
pub(crate) async fn commit_settings<F>(state: &AppState, req: SaveSettingsRequest, persist: F) -> Result<(), String>
where
    F: FnOnce(&AppConfig) -> Result<(), String>,
{
    if matches!(req.default_page_size, Some(0)) {
        return Err("分页大小必须大于0".to_string());
    }
    if matches!(&req.result_languages, Some(langs) if langs.is_empty()) {
        return Err("至少选择一种结果语言".to_string());
    }

    let mut next = (*state.config.read()).clone();
    let search = &mut next.search;
    if let Some(langs) = req.result_languages {
        search.result_languages = langs;
    }
    if let Some(lang) = req.default_search_language {
        search.default_search_language = lang;
    }
    if let Some(lang) = req.source_language {
        search.source_language = lang;
    }
    if let Some(gender) = req.is_male {
        search.is_male = gender;
    }
    if let Some(size) = req.default_page_size {
        search.default_page_size = size;
    }
    if let Some(flag) = req.missing_text_sorts_first {
        search.missing_text_sorts_first = flag;
    }
    let rescan = match req.asset_dir {
        Some(dir) if dir != next.voice.asset_dir => {
            next.voice.asset_dir = dir;
            true
        }
        _ => false,
    };

    persist(&next)?;

    let asset_dir = next.voice.asset_dir.clone();
    *state.config.write() = next;

    if rescan {
        // Directory scan uses blocking std::fs calls
        match tokio::task::spawn_blocking(move || DirectoryVoiceOracle::scan(&asset_dir)).await {
            Ok(oracle) => {
                let oracle: Arc<dyn VoiceOracle> = Arc::new(oracle);
                *state.voice.write() = oracle;
            }
            Err(e) => tracing::error!("Voice asset scan failed: {}", e),
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextLanguage {
    pub lang_code: LangCode,
    pub name: String,
}

/// GET /api/getImportedTextLanguages - 已导入的文本语言
pub async fn get_imported_text_languages(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<Vec<TextLanguage>>> {
    let result = state.store.imported_langs().await.map(|langs| {
        langs
            .into_iter()
            .map(|(lang_code, name)| TextLanguage { lang_code, name })
            .collect()
    });
    Json(result.into())
}
