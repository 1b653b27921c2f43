use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tracing::{debug, info};

use tubedl::common::logger::PrettyLogger;
use tubedl::downloader::progress::BarProgress;
use tubedl::parser::stream_selector;
use tubedl::parser::ytdlp::YtDlpSource;
use tubedl::parser::VideoParser;
use tubedl::{log_error, log_info, log_step, log_success, log_warning};
use tubedl::{DownloadConfig, DownloadError, VideoDownloader};

mod cli;

enum Mode {
    Video,
    AudioOnly,
}

struct App {
    parser: VideoParser,
    downloader: VideoDownloader,
    choice: Option<String>,
    input: Lines<BufReader<Stdin>>,
}

impl App {
    fn new(args: &cli::Cli) -> anyhow::Result<Self> {
        let config = DownloadConfig {
            output_dir: args.output_dir.clone(),
            source_format: args.source_format(),
            output_format: args.format,
            ffmpeg_path: args.ffmpeg.clone(),
            ytdlp_path: args.yt_dlp.clone(),
        };
        debug!("下载配置: {:?}", config);

        let source = Arc::new(YtDlpSource::new(config.ytdlp_path.clone()));
        let downloader = VideoDownloader::from_config(config).context("初始化下载器失败")?;

        Ok(Self {
            parser: VideoParser::new(source),
            downloader,
            choice: args.choice.clone(),
            input: BufReader::new(tokio::io::stdin()).lines(),
        })
    }

    /// 读取一行输入，EOF 时返回 `None`
    async fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(prompt.as_bytes()).await?;
        stdout.flush().await?;
        let line = self.input.next_line().await.context("读取输入失败")?;
        Ok(line.map(|l| l.trim().to_string()))
    }

    async fn ask_mode(&mut self) -> anyhow::Result<Option<Mode>> {
        println!("\n请选择下载方式:");
        println!("1 - 视频（选择清晰度，必要时合并音频）");
        println!("2 - 仅音频（mp3）");
        let answer = self.read_line("请输入 1 或 2: ").await?;
        Ok(match answer.as_deref() {
            Some("1") => Some(Mode::Video),
            Some("2") => Some(Mode::AudioOnly),
            _ => None,
        })
    }

    async fn download(
        &mut self,
        url: &str,
        mode: Option<Mode>,
        interactive: bool,
    ) -> anyhow::Result<PathBuf> {
        let source = self.downloader.config().source_format;
        let meta = self.parser.parse(url).await.map_err(DownloadError::from)?;
        PrettyLogger::video_title(&meta.title);

        let mode = match mode {
            Some(mode) => mode,
            None => match self.ask_mode().await? {
                Some(mode) => mode,
                None => anyhow::bail!("无效的选择"),
            },
        };

        let mut job = match mode {
            Mode::AudioOnly => VideoDownloader::prepare_audio_job(&meta)?,
            Mode::Video => {
                let streams = stream_selector::enumerate(&meta.streams, source);
                if streams.is_empty() {
                    return Err(DownloadError::from(tubedl::ParseError::NoStreams(format!(
                        "{} 没有 {} 格式的视频流",
                        meta.title, source
                    )))
                    .into());
                }

                log_step!("可用的视频流");
                for (i, stream) in streams.iter().enumerate() {
                    PrettyLogger::stream_entry(i + 1, stream.label());
                }

                let choice = match self.choice.clone() {
                    Some(choice) => choice,
                    None if interactive => self
                        .read_line("\n请输入要下载的清晰度序号（直接回车选择最高）: ")
                        .await?
                        .unwrap_or_default(),
                    None => String::new(),
                };
                let video = stream_selector::select_stream(&streams, &choice)
                    .cloned()
                    .ok_or(DownloadError::NoVideoStream)?;
                log_info!("已选择: {}", video.label());
                VideoDownloader::prepare_job(&meta, video)
            }
        };

        let progress = BarProgress::new();
        let path = self.downloader.download(&mut job, &progress).await?;
        Ok(path)
    }

    async fn print_history(&self) {
        let entries = self.downloader.history().entries().await;
        PrettyLogger::history(entries.iter().map(|e| {
            format!("[{}] {}", e.completed_at.format("%H:%M:%S"), e.file_name)
        }));
    }
}

/// 输出单次下载的结果，失败时只打印一次并返回非零退出码
fn report(result: anyhow::Result<PathBuf>) -> ExitCode {
    match result {
        Ok(path) => {
            log_success!("下载完成: {}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            log_error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = cli::Cli::parse();

    // 初始化日志
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let mut app = App::new(&args)?;

    if let Some(url) = args.url.as_deref() {
        info!("开始下载: {}", url);
        let mode = if args.audio_only {
            Mode::AudioOnly
        } else {
            Mode::Video
        };
        return Ok(report(app.download(url, Some(mode), false).await));
    }

    // 交互模式：循环下载直到输入为空
    loop {
        PrettyLogger::separator();
        let Some(url) = app.read_line("请输入视频链接（直接回车退出）: ").await? else {
            break;
        };
        if url.is_empty() {
            break;
        }

        let mode = if args.audio_only {
            Some(Mode::AudioOnly)
        } else {
            None
        };
        report(app.download(&url, mode, true).await);
    }

    app.print_history().await;
    if app.downloader.history().is_empty().await {
        log_warning!("没有下载任何文件");
    } else {
        println!("{}", "再见！".green());
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_download_maps_to_failure_exit_code() {
        let err = anyhow::Error::from(DownloadError::Transfer("HTTP 404".to_string()));
        assert_eq!(report(Err(err)), ExitCode::FAILURE);
    }

    #[test]
    fn finished_download_maps_to_success_exit_code() {
        assert_eq!(
            report(Ok(PathBuf::from("Downloads/video_abc.mp4"))),
            ExitCode::SUCCESS
        );
    }
}
