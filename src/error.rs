use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ThemisError>;

#[derive(Debug, Error)]
pub enum ThemisError {
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 日记根目录不存在或无法打开，整次遍历失败。
    #[error("日记目录不可用: {path} - {reason}")]
    VaultUnavailable { path: PathBuf, reason: String },

    #[error("无效请求: {0}")]
    InvalidRequest(String),

    #[error("内部错误: {0}")]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
