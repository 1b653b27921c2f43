use std::path::PathBuf;

use crate::parser::models::{Container, SourceFormat};

pub const DEFAULT_OUTPUT_DIR: &str = "Downloads";

/// 下载配置，每个下载器实例各持一份
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadConfig {
    pub output_dir: PathBuf,
    pub source_format: SourceFormat, // 从解析结果中挑选视频流的格式
    pub output_format: Container,
    pub ffmpeg_path: String,
    pub ytdlp_path: String,
}

impl DownloadConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            source_format: SourceFormat::Mp4,
            output_format: Container::Mp4,
            ffmpeg_path: std::env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            ytdlp_path: std::env::var("YTDLP_PATH").unwrap_or_else(|_| "yt-dlp".to_string()),
        }
    }
}
