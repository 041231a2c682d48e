use axum::{
    routing::{get, post},
    Router,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod state;

use state::AppState;
use textmap_search::config;
use textmap_search::search::{DirectoryVoiceOracle, VoiceOracle};
use textmap_search::store::{schema, TextStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "textmap_search=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration / 加载配置
    let app_config = config::load_config().map_err(anyhow::Error::msg)?;
    tracing::info!("Server will listen on {}:{}", app_config.server.host, app_config.server.port);

    // Create data directory if not exists / 创建数据目录
    let data_dir = app_config.get_data_dir();
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)?;
        tracing::info!("Created data directory: {:?}", data_dir);
    }

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| app_config.get_database_url());

    let store = TextStore::open(&database_url).await?;
    schema::ensure_schema(store.pool()).await?;

    if !app_config.is_asset_dir_valid() {
        tracing::warn!("Voice asset directory not set or invalid, voice lookups are disabled");
    }
    let voice: Arc<dyn VoiceOracle> = Arc::new(DirectoryVoiceOracle::scan(&app_config.voice.asset_dir));

    let bind_addr = app_config.get_bind_address();
    let state = Arc::new(AppState {
        store: Arc::new(store),
        voice: RwLock::new(voice),
        config: RwLock::new(app_config),
    });

    let app = Router::new()
        // Search / 搜索
        .route("/api/keywordQuery", post(api::search::keyword_query))
        .route("/api/getTalkFromHash", post(api::search::get_talk_from_hash))
        .route("/api/getSubtitleContext", post(api::search::get_subtitle_context))
        .route("/api/getReadableContent", post(api::search::get_readable_content))
        .route("/api/getQuestDialogues", post(api::search::get_quest_dialogues))
        .route("/api/nameSearch", post(api::search::name_search))
        .route("/api/avatarSearch", post(api::search::avatar_search))
        .route("/api/avatarVoice", post(api::search::avatar_voice))
        // Voice / 语音
        .route("/api/getVoiceOver", post(api::voice::get_voice_over))
        .route("/api/getImportedVoiceLanguages", get(api::voice::get_imported_voice_languages))
        // Settings / 设置
        .route("/api/getImportedTextLanguages", get(api::settings::get_imported_text_languages))
        .route("/api/getSettings", get(api::settings::get_settings))
        .route("/api/saveSettings", post(api::settings::save_settings))
        .route("/api/health", get(api::server::health_check))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await?;

    tracing::info!("Server running at http://{}", bind_addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<std::net::SocketAddr>()).await?;

    state.store.close().await;
    Ok(())
}
