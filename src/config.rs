//! Application configuration module / 应用配置模块
//!
//! Manages application configuration loaded from config.json
//! Creates default config file on first run / 首次运行时创建默认配置文件
//!
//! The loaded value lives in the server state; the search engine only ever sees a
//! request-scoped [`SearchContext`](crate::search::SearchContext) snapshot.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::{Path, PathBuf};

use crate::models::LangCode;

/// Application configuration / 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration / 服务器配置
    pub server: ServerConfig,
    /// Database configuration / 数据库配置
    pub database: DatabaseConfig,
    /// Search configuration / 搜索配置
    pub search: SearchConfig,
    /// Voice asset configuration / 语音资源配置
    pub voice: VoiceConfig,
}

/// Server configuration / 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address / 服务器监听地址
    pub host: String,
    /// Server port / 服务器端口
    pub port: u16,
}

/// Database configuration / 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Data directory path / 数据目录路径
    pub data_dir: String,
    /// Text database file (relative to data_dir) / 文本数据库文件
    pub db_file: String,
}

/// Search configuration / 搜索配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Languages shown next to every hit / 结果显示语言
    pub result_languages: Vec<LangCode>,
    /// Language preselected in the UI / 默认搜索语言
    pub default_search_language: LangCode,
    /// Language used for origins and talker names / 来源与说话者名称语言
    pub source_language: LangCode,
    /// Gender used when rendering placeholders / 占位符性别
    pub is_male: GenderPreference,
    /// Page size used when the request has none / 默认分页大小
    pub default_page_size: u32,
    /// Rank hits without query-language text as if empty (length 0) / 缺失文本按长度0排序
    pub missing_text_sorts_first: bool,
}

/// Voice asset configuration / 语音资源配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Game install directory holding AudioAssets / 游戏资源目录
    pub asset_dir: String,
}

/// Gender preference for `{M#..}{F#..}` placeholders / 占位符性别偏好
///
/// Stored as `true`, `false` or `"both"` / 存储为 true、false 或 "both"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GenderPreference {
    Male,
    Female,
    #[default]
    Both,
}

impl Serialize for GenderPreference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            GenderPreference::Male => serializer.serialize_bool(true),
            GenderPreference::Female => serializer.serialize_bool(false),
            GenderPreference::Both => serializer.serialize_str("both"),
        }
    }
}

impl<'de> Deserialize<'de> for GenderPreference {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Flag(true) => Ok(GenderPreference::Male),
            Raw::Flag(false) => Ok(GenderPreference::Female),
            Raw::Text(s) if s.eq_ignore_ascii_case("both") => Ok(GenderPreference::Both),
            Raw::Text(s) => Err(serde::de::Error::custom(format!("invalid isMale value: {}", s))),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            db_file: "data.db".to_string(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            result_languages: vec![LangCode::CHS, LangCode::EN, LangCode::JP],
            default_search_language: LangCode::CHS,
            source_language: LangCode::CHS,
            is_male: GenderPreference::Both,
            default_page_size: 50,
            missing_text_sorts_first: true,
        }
    }
}

impl AppConfig {
    /// Get the full database URL / 获取完整的数据库URL
    pub fn get_database_url(&self) -> String {
        let db_path = Path::new(&self.database.data_dir).join(&self.database.db_file);
        format!("sqlite:{}?mode=rwc", db_path.to_string_lossy())
    }

    /// Get the full data directory path / 获取完整的数据目录路径
    pub fn get_data_dir(&self) -> PathBuf {
        PathBuf::from(&self.database.data_dir)
    }

    /// Get the server bind address / 获取服务器绑定地址
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Whether the asset dir contains an AudioAssets folder / 资源目录是否有效
    pub fn is_asset_dir_valid(&self) -> bool {
        let dir = Path::new(&self.voice.asset_dir);
        if self.voice.asset_dir.is_empty() || !dir.is_dir() {
            return false;
        }
        dir.join("StreamingAssets").join("AudioAssets").is_dir()
            || dir.join("Persistent").join("AudioAssets").is_dir()
    }
}

/// Get the config file path / 获取配置文件路径
fn get_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("config.json")
}

/// Load configuration from file, or create default if not exists / 加载配置文件，不存在则创建默认配置
pub fn load_config() -> Result<AppConfig, String> {
    let config_path = get_config_path();

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        tracing::info!("Loaded configuration from {:?}", config_path);
        Ok(config)
    } else {
        let config = AppConfig::default();
        save_config(&config)?;
        tracing::info!("Created default configuration at {:?}", config_path);
        Ok(config)
    }
}

/// Save configuration to file / 保存配置到文件
pub fn save_config(config: &AppConfig) -> Result<(), String> {
    let config_path = get_config_path();

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    std::fs::write(&config_path, content)
        .map_err(|e| format!("Failed to write config file: {}", e))?;

    Ok(())
}
