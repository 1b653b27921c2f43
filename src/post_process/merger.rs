use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::downloader::error::DownloadError;
use crate::parser::models::Container;

/// 外部复用器（合并音视频 / 转换音频）
#[async_trait]
pub trait Muxer: Send + Sync {
    async fn merge_av(
        &self,
        video_path: &Path,
        audio_path: &Path,
        output_path: &Path,
        container: Container,
    ) -> Result<(), DownloadError>;

    async fn extract_audio(
        &self,
        input_path: &Path,
        output_path: &Path,
        container: Container,
    ) -> Result<(), DownloadError>;
}

/// 调用系统 FFmpeg
#[derive(Debug, Clone)]
pub struct MediaMerger {
    program: String,
}

impl MediaMerger {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// 视频流直接复制，音频转成容器的标准编码，覆盖已有输出
    pub fn merge_args(
        video_path: &Path,
        audio_path: &Path,
        output_path: &Path,
        container: Container,
    ) -> Vec<OsString> {
        vec![
            "-y".into(),
            "-i".into(),
            video_path.into(),
            "-i".into(),
            audio_path.into(),
            "-c:v".into(),
            "copy".into(),
            "-c:a".into(),
            container.audio_codec().into(),
            output_path.into(),
        ]
    }

    pub fn extract_audio_args(
        input_path: &Path,
        output_path: &Path,
        container: Container,
    ) -> Vec<OsString> {
        vec![
            "-y".into(),
            "-i".into(),
            input_path.into(),
            "-vn".into(),
            "-c:a".into(),
            container.audio_codec().into(),
            output_path.into(),
        ]
    }

    async fn run(&self, args: Vec<OsString>, output_path: &Path) -> Result<(), DownloadError> {
        debug!("执行 {} {:?}", self.program, args);

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    error!("❌ 未检测到 ffmpeg，请确保系统中已安装并配置了 ffmpeg 可执行路径。");
                    error!("或者设置环境变量 FFMPEG_PATH 指向 ffmpeg 可执行文件路径");
                }
                DownloadError::MergeError(format!("无法启动 {}: {}", self.program, e))
            })?;

        if !output.status.success() {
            // 只记录日志，不解析输出内容
            let err_msg = String::from_utf8_lossy(&output.stderr);
            error!("❌ ffmpeg 执行失败，错误日志如下：\n{}", err_msg);
            return Err(DownloadError::MergeError(format!(
                "{} 退出码 {:?}，输出文件: {:?}",
                self.program,
                output.status.code(),
                output_path
            )));
        }

        Ok(())
    }
}

impl Default for MediaMerger {
    fn default() -> Self {
        Self::new(std::env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()))
    }
}

#[async_trait]
impl Muxer for MediaMerger {
    async fn merge_av(
        &self,
        video_path: &Path,
        audio_path: &Path,
        output_path: &Path,
        container: Container,
    ) -> Result<(), DownloadError> {
        if !video_path.exists() {
            return Err(DownloadError::FileNotFound(video_path.to_path_buf()));
        }
        if !audio_path.exists() {
            return Err(DownloadError::FileNotFound(audio_path.to_path_buf()));
        }

        debug!("开始合并视频和音频 -> 输出路径: {:?}", output_path);
        let args = Self::merge_args(video_path, audio_path, output_path, container);
        self.run(args, output_path).await?;

        info!("✅ 视频与音频合并成功，输出文件: {:?}", output_path);
        Ok(())
    }

    async fn extract_audio(
        &self,
        input_path: &Path,
        output_path: &Path,
        container: Container,
    ) -> Result<(), DownloadError> {
        if !input_path.exists() {
            return Err(DownloadError::FileNotFound(input_path.to_path_buf()));
        }

        let args = Self::extract_audio_args(input_path, output_path, container);
        self.run(args, output_path).await?;

        info!("✅ 音频转换成功，输出文件: {:?}", output_path);
        Ok(())
    }
}
