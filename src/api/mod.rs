pub mod search;
pub mod server;
pub mod settings;
pub mod voice;

use serde::Serialize;
use textmap_search::error::SearchError;

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 200,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            code: 400,
            message: message.to_string(),
            data: None,
        }
    }

    /// Map an engine error: lookup misses are shown to the user, store failures are logged / 错误映射
    pub fn from_error(err: SearchError) -> Self {
        match err {
            SearchError::NotFound(message) => Self {
                code: 404,
                message,
                data: None,
            },
            SearchError::Store(e) => {
                tracing::error!("Store error: {}", e);
                Self {
                    code: 500,
                    message: "数据库错误".to_string(),
                    data: None,
                }
            }
        }
    }
}

impl<T> From<Result<T, SearchError>> for ApiResponse<T> {
    fn from(result: Result<T, SearchError>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(e) => Self::from_error(e),
        }
    }
}
