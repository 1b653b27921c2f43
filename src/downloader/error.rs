use std::path::PathBuf;

use thiserror::Error;

use crate::parser::errors::ParseError;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("解析视频失败: {0}")]
    Resolution(#[from] ParseError),

    #[error("下载失败: {0}")]
    Transfer(String),

    #[error("HTTP错误: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("合并音视频失败: {0}")]
    MergeError(String),

    #[error("没有可用的音频流")]
    NoAudioStream,

    #[error("没有选择视频流")]
    NoVideoStream,

    #[error("文件不存在: {0:?}")]
    FileNotFound(PathBuf),

    #[error("无效的状态: {0}")]
    InvalidState(String),
}
