use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::DownloadError;
use crate::common::utils::{sanitize_filename, unique_token};
use crate::parser::models::StreamDescriptor;

/// 任务状态，只能按声明顺序向后推进
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    DownloadingVideo,
    DownloadingAudio,
    Merging,
    Complete,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Pending => "等待中",
            Self::DownloadingVideo => "下载视频",
            Self::DownloadingAudio => "下载音频",
            Self::Merging => "合并音视频",
            Self::Complete => "已完成",
            Self::Failed => "失败",
        };
        f.write_str(text)
    }
}

/// 一次由用户发起的下载
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub title: String,
    pub video: Option<StreamDescriptor>,
    pub audio: Option<StreamDescriptor>,
    token: String,
    status: JobStatus,
}

impl DownloadJob {
    /// 视频任务；非音视频合一的流需要同时给出音频流
    pub fn video(
        title: impl Into<String>,
        video: StreamDescriptor,
        audio: Option<StreamDescriptor>,
    ) -> Self {
        Self {
            title: title.into(),
            video: Some(video),
            audio,
            token: unique_token(),
            status: JobStatus::Pending,
        }
    }

    /// 仅下载音频
    pub fn audio_only(title: impl Into<String>, audio: StreamDescriptor) -> Self {
        Self {
            title: title.into(),
            video: None,
            audio: Some(audio),
            token: unique_token(),
            status: JobStatus::Pending,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn advance(&mut self, next: JobStatus) -> Result<(), DownloadError> {
        if self.status.is_terminal() {
            return Err(DownloadError::InvalidState(format!(
                "任务已结束 ({})，不能切换到 {}",
                self.status, next
            )));
        }
        if next != JobStatus::Failed && next <= self.status {
            return Err(DownloadError::InvalidState(format!(
                "不能从 {} 回到 {}",
                self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    /// 最终文件：`<标题>_<token>.<ext>`
    pub fn output_path(&self, dir: &Path, ext: &str) -> PathBuf {
        dir.join(format!(
            "{}_{}.{}",
            sanitize_filename(&self.title),
            self.token,
            ext
        ))
    }

    pub fn temp_video_path(&self, dir: &Path) -> Option<PathBuf> {
        self.video
            .as_ref()
            .map(|v| dir.join(format!("temp_video_{}.{}", self.token, v.ext)))
    }

    pub fn temp_audio_path(&self, dir: &Path) -> Option<PathBuf> {
        self.audio
            .as_ref()
            .map(|a| dir.join(format!("temp_audio_{}.{}", self.token, a.ext)))
    }
}
