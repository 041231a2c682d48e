use thiserror::Error;

/// Errors surfaced by the search core / 搜索核心错误
#[derive(Debug, Error)]
pub enum SearchError {
    /// User-facing lookup miss, e.g. a hash that belongs to no scene / 未找到
    #[error("{0}")]
    NotFound(String),
    /// Store connectivity or schema failure; never retried / 数据库错误
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl SearchError {
    pub fn not_found(message: impl Into<String>) -> Self {
        SearchError::NotFound(message.into())
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
