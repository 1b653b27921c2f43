use thiserror::Error;

/// 解析视频地址失败（无法得到可下载的流信息）
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("无效的URL: {0}")]
    InvalidUrl(String),
    #[error("未找到解析器 {program}: {message}")]
    ResolverNotFound { program: String, message: String },
    #[error("解析失败 (退出码 {code:?}): {message}")]
    ResolverFailed { code: Option<i32>, message: String },
    #[error("解析结果格式错误: {0}")]
    InvalidResponse(String),
    #[error("没有可用的流: {0}")]
    NoStreams(String),
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        ParseError::InvalidResponse(err.to_string())
    }
}

impl From<url::ParseError> for ParseError {
    fn from(err: url::ParseError) -> Self {
        ParseError::InvalidUrl(err.to_string())
    }
}
