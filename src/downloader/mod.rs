use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::DownloadConfig;
use crate::parser::models::{Container, StreamDescriptor, VideoMeta};
use crate::parser::stream_selector;
use crate::post_process::{self, merger::MediaMerger, merger::Muxer};
use self::core::{HttpTransfer, Transfer};
use self::error::DownloadError;
use self::history::History;
use self::progress::{ChannelProgress, DownloadEvent, ProgressReporter};
use self::task::{DownloadJob, JobStatus};

pub mod core;
pub mod error;
pub mod history;
pub mod progress;
pub mod task;

/// 选择流、下载并合并音视频
///
/// 每个任务通过自己的 token 生成文件名，多个任务可以并发执行而不共享可变状态。
pub struct VideoDownloader {
    config: DownloadConfig,
    transfer: Arc<dyn Transfer>,
    merger: Arc<dyn Muxer>,
    history: History,
}

impl VideoDownloader {
    pub fn new(config: DownloadConfig, transfer: Arc<dyn Transfer>, merger: Arc<dyn Muxer>) -> Self {
        Self {
            config,
            transfer,
            merger,
            history: History::new(),
        }
    }

    /// 使用 HTTP 下载和系统 FFmpeg
    pub fn from_config(config: DownloadConfig) -> Result<Self, DownloadError> {
        let transfer = Arc::new(HttpTransfer::new()?);
        let merger = Arc::new(MediaMerger::new(config.ffmpeg_path.clone()));
        Ok(Self::new(config, transfer, merger))
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// 根据选中的视频流创建任务，非音视频合一时附带最佳音频流
    pub fn prepare_job(meta: &VideoMeta, video: StreamDescriptor) -> DownloadJob {
        let audio = if video.is_progressive() {
            None
        } else {
            stream_selector::select_best_audio(&meta.streams).cloned()
        };
        DownloadJob::video(meta.title.clone(), video, audio)
    }

    pub fn prepare_audio_job(meta: &VideoMeta) -> Result<DownloadJob, DownloadError> {
        let audio = stream_selector::select_best_audio(&meta.streams)
            .cloned()
            .ok_or(DownloadError::NoAudioStream)?;
        Ok(DownloadJob::audio_only(meta.title.clone(), audio))
    }

    /// 按任务类型下载
    pub async fn download(
        &self,
        job: &mut DownloadJob,
        progress: &dyn ProgressReporter,
    ) -> Result<PathBuf, DownloadError> {
        if job.video.is_some() {
            self.download_and_merge(job, progress).await
        } else {
            self.download_audio_only(job, progress).await
        }
    }

    pub async fn download_and_merge(
        &self,
        job: &mut DownloadJob,
        progress: &dyn ProgressReporter,
    ) -> Result<PathBuf, DownloadError> {
        let result = self.run_video(job, progress).await;
        self.finish(job, progress, result).await
    }

    pub async fn download_audio_only(
        &self,
        job: &mut DownloadJob,
        progress: &dyn ProgressReporter,
    ) -> Result<PathBuf, DownloadError> {
        let result = self.run_audio_only(job, progress).await;
        self.finish(job, progress, result).await
    }

    /// 在后台任务中下载，状态和进度通过通道发给调用方
    pub fn spawn(
        self: &Arc<Self>,
        mut job: DownloadJob,
        events: UnboundedSender<DownloadEvent>,
    ) -> JoinHandle<Result<PathBuf, DownloadError>> {
        let downloader = Arc::clone(self);
        tokio::spawn(async move {
            let progress = ChannelProgress::new(events);
            let result = downloader.download(&mut job, &progress).await;
            match &result {
                Ok(path) => progress.send(DownloadEvent::Finished(path.clone())),
                Err(e) => progress.send(DownloadEvent::Failed(e.to_string())),
            }
            result
        })
    }

    async fn run_video(
        &self,
        job: &mut DownloadJob,
        progress: &dyn ProgressReporter,
    ) -> Result<PathBuf, DownloadError> {
        let video = job.video.clone().ok_or(DownloadError::NoVideoStream)?;
        let dir = self.config.output_dir.clone();
        tokio::fs::create_dir_all(&dir).await?;

        Self::set_status(job, progress, JobStatus::DownloadingVideo)?;

        if video.is_progressive() {
            info!("下载音视频合一的流: {}", video.label());
            let output = job.output_path(&dir, &video.ext);
            if let Err(e) = self.transfer.fetch(&video, &output, progress).await {
                post_process::cleanup(&[&output]).await;
                return Err(e);
            }
            return Ok(output);
        }

        let audio = job.audio.clone().ok_or(DownloadError::NoAudioStream)?;
        let temp_video = job
            .temp_video_path(&dir)
            .ok_or(DownloadError::NoVideoStream)?;
        let temp_audio = job
            .temp_audio_path(&dir)
            .ok_or(DownloadError::NoAudioStream)?;
        let output = job.output_path(&dir, self.config.output_format.extension());

        let result = self
            .fetch_and_merge(job, progress, &video, &audio, &temp_video, &temp_audio, &output)
            .await;

        // 无论合并是否成功都删除临时文件
        post_process::cleanup(&[&temp_video, &temp_audio]).await;
        result.map(|_| output)
    }

    #[allow(clippy::too_many_arguments)]
    async fn fetch_and_merge(
        &self,
        job: &mut DownloadJob,
        progress: &dyn ProgressReporter,
        video: &StreamDescriptor,
        audio: &StreamDescriptor,
        temp_video: &Path,
        temp_audio: &Path,
        output: &Path,
    ) -> Result<(), DownloadError> {
        info!("下载视频流: {}", video.label());
        self.transfer.fetch(video, temp_video, progress).await?;

        Self::set_status(job, progress, JobStatus::DownloadingAudio)?;
        info!("下载音频流: 格式ID={}, 码率={:?}", audio.format_id, audio.abr);
        self.transfer.fetch(audio, temp_audio, progress).await?;

        Self::set_status(job, progress, JobStatus::Merging)?;
        info!("开始合并视频和音频...");
        self.merger
            .merge_av(temp_video, temp_audio, output, self.config.output_format)
            .await
    }

    async fn run_audio_only(
        &self,
        job: &mut DownloadJob,
        progress: &dyn ProgressReporter,
    ) -> Result<PathBuf, DownloadError> {
        let audio = job.audio.clone().ok_or(DownloadError::NoAudioStream)?;
        let dir = self.config.output_dir.clone();
        tokio::fs::create_dir_all(&dir).await?;

        let temp_audio = job
            .temp_audio_path(&dir)
            .ok_or(DownloadError::NoAudioStream)?;
        let output = job.output_path(&dir, Container::Mp3.extension());

        Self::set_status(job, progress, JobStatus::DownloadingAudio)?;
        info!("仅下载音频: {}", job.title);

        let result = self
            .fetch_and_extract(job, progress, &audio, &temp_audio, &output)
            .await;

        post_process::cleanup(&[&temp_audio]).await;
        result.map(|_| output)
    }

    async fn fetch_and_extract(
        &self,
        job: &mut DownloadJob,
        progress: &dyn ProgressReporter,
        audio: &StreamDescriptor,
        temp_audio: &Path,
        output: &Path,
    ) -> Result<(), DownloadError> {
        self.transfer.fetch(audio, temp_audio, progress).await?;

        Self::set_status(job, progress, JobStatus::Merging)?;
        self.merger
            .extract_audio(temp_audio, output, Container::Mp3)
            .await
    }

    fn set_status(
        job: &mut DownloadJob,
        progress: &dyn ProgressReporter,
        status: JobStatus,
    ) -> Result<(), DownloadError> {
        job.advance(status)?;
        debug!("任务 {} 状态: {}", job.token(), status);
        progress.on_status(status);
        Ok(())
    }

    async fn finish(
        &self,
        job: &mut DownloadJob,
        progress: &dyn ProgressReporter,
        result: Result<PathBuf, DownloadError>,
    ) -> Result<PathBuf, DownloadError> {
        match result {
            Ok(path) => {
                Self::set_status(job, progress, JobStatus::Complete)?;
                let entry = self.history.push(&path).await;
                info!("✅ 下载完成: {}", entry.file_name);
                Ok(path)
            }
            Err(e) => {
                if Self::set_status(job, progress, JobStatus::Failed).is_err() {
                    debug!("任务 {} 已处于结束状态", job.token());
                }
                error!("❌ 任务失败: {}", e);
                Err(e)
            }
        }
    }
}
