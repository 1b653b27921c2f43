use std::path::PathBuf;
use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc::UnboundedSender;

use super::task::JobStatus;

/// 下载进度回调，与具体的界面实现解耦
///
/// 调用频率由传输层决定，不保证最后一定会收到 100%。
pub trait ProgressReporter: Send + Sync {
    fn on_progress(&self, bytes_done: u64, bytes_total: u64);

    fn on_status(&self, _status: JobStatus) {}
}

/// 计算百分比，总大小未知时返回 `None`
pub fn percentage(bytes_done: u64, bytes_total: u64) -> Option<f64> {
    if bytes_total == 0 {
        return None;
    }
    Some((bytes_done as f64 / bytes_total as f64 * 100.0).min(100.0))
}

pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn on_progress(&self, _bytes_done: u64, _bytes_total: u64) {}
}

/// 终端进度条
pub struct BarProgress {
    pb: ProgressBar,
    status: Mutex<JobStatus>,
}

impl BarProgress {
    pub fn new() -> Self {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        Self {
            pb,
            status: Mutex::new(JobStatus::Pending),
        }
    }

    // 例如 "正在下载视频 42.0%"，总大小未知时只显示状态
    fn message(status: JobStatus, bytes_done: u64, bytes_total: u64) -> String {
        match percentage(bytes_done, bytes_total) {
            Some(pct) => format!("{} {:.1}%", status, pct),
            None => status.to_string(),
        }
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for BarProgress {
    fn on_progress(&self, bytes_done: u64, bytes_total: u64) {
        if bytes_total > 0 && self.pb.length() != Some(bytes_total) {
            self.pb.set_length(bytes_total);
        }
        self.pb.set_position(bytes_done);
        if let Ok(status) = self.status.lock() {
            self.pb
                .set_message(Self::message(*status, bytes_done, bytes_total));
        }
    }

    fn on_status(&self, status: JobStatus) {
        if let Ok(mut current) = self.status.lock() {
            *current = status;
        }
        match status {
            JobStatus::DownloadingVideo | JobStatus::DownloadingAudio => {
                self.pb.reset();
                self.pb.set_length(0);
                self.pb.set_message(status.to_string());
            }
            JobStatus::Merging => self.pb.set_message(status.to_string()),
            JobStatus::Complete => self.pb.finish_with_message("下载完成"),
            JobStatus::Failed => self.pb.abandon_with_message("下载失败"),
            JobStatus::Pending => {}
        }
    }
}

/// 发给界面线程的事件
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadEvent {
    Status(JobStatus),
    Progress {
        bytes_done: u64,
        bytes_total: u64,
        percent: Option<f64>, // 总大小未知时为 None
    },
    Finished(PathBuf),
    Failed(String),
}

/// 把进度转成事件发送到通道，由调用方在自己的线程里更新界面
#[derive(Clone)]
pub struct ChannelProgress {
    tx: UnboundedSender<DownloadEvent>,
}

impl ChannelProgress {
    pub fn new(tx: UnboundedSender<DownloadEvent>) -> Self {
        Self { tx }
    }

    // 接收端关闭后直接丢弃事件
    pub fn send(&self, event: DownloadEvent) {
        let _ = self.tx.send(event);
    }
}

impl ProgressReporter for ChannelProgress {
    fn on_progress(&self, bytes_done: u64, bytes_total: u64) {
        self.send(DownloadEvent::Progress {
            bytes_done,
            bytes_total,
            percent: percentage(bytes_done, bytes_total),
        });
    }

    fn on_status(&self, status: JobStatus) {
        self.send(DownloadEvent::Status(status));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn percentage_of_known_and_unknown_sizes() {
        assert_eq!(percentage(50, 200), Some(25.0));
        assert_eq!(percentage(10, 0), None);
        assert_eq!(percentage(300, 200), Some(100.0));
    }

    #[test]
    fn channel_progress_forwards_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let progress = ChannelProgress::new(tx);
        progress.on_status(JobStatus::DownloadingVideo);
        progress.on_progress(1, 2);
        progress.on_progress(7, 0);

        assert_eq!(
            rx.try_recv().unwrap(),
            DownloadEvent::Status(JobStatus::DownloadingVideo)
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            DownloadEvent::Progress {
                bytes_done: 1,
                bytes_total: 2,
                percent: Some(50.0),
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            DownloadEvent::Progress {
                bytes_done: 7,
                bytes_total: 0,
                percent: None,
            }
        );
    }

    #[test]
    fn bar_message_shows_percentage_when_size_known() {
        assert_eq!(
            BarProgress::message(JobStatus::DownloadingAudio, 1, 4),
            format!("{} 25.0%", JobStatus::DownloadingAudio)
        );
        assert_eq!(
            BarProgress::message(JobStatus::DownloadingVideo, 10, 0),
            JobStatus::DownloadingVideo.to_string()
        );

        let bar = BarProgress::new();
        bar.on_status(JobStatus::DownloadingVideo);
        bar.on_progress(50, 200);
        assert_eq!(
            bar.pb.message(),
            format!("{} 25.0%", JobStatus::DownloadingVideo)
        );
    }

    #[test]
    fn closed_channel_is_ignored() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        ChannelProgress::new(tx).on_progress(1, 1);
    }
}
