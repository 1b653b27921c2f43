use clap::Parser;
use std::path::PathBuf;

use tubedl::config::DEFAULT_OUTPUT_DIR;
use tubedl::parser::models::{Container, SourceFormat};

/// 视频下载器
#[derive(Parser, Debug)]
#[command(name = "tubedl")]
#[command(version = "0.1.0")]
#[command(about = "选择清晰度下载视频，必要时用 FFmpeg 合并音视频", long_about = None)]
pub struct Cli {
    /// 视频链接，不提供时进入交互模式
    #[arg(long, value_name = "URL")]
    #[arg(value_hint = clap::ValueHint::Url)]
    pub url: Option<String>,

    /// 视频保存目录
    #[arg(long, value_name = "DIR")]
    #[arg(default_value = DEFAULT_OUTPUT_DIR)]
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub output_dir: PathBuf,

    /// 清晰度序号（从 1 开始），为空或无效时选择最高清晰度
    #[arg(long, value_name = "N")]
    pub choice: Option<String>,

    /// 只下载音频并转换为 mp3
    #[arg(long)]
    pub audio_only: bool,

    /// 输出容器格式
    #[arg(long, value_name = "FORMAT", default_value = "mp4")]
    #[arg(value_parser = parse_video_container)]
    #[arg(help = "输出格式: mp4, mkv, webm")]
    pub format: Container,

    /// 视频源格式，默认 webm 输出取 webm，其余取 mp4
    #[arg(long, value_name = "FORMAT")]
    #[arg(help = "视频源格式: mp4, webm")]
    pub source_format: Option<SourceFormat>,

    /// ffmpeg 可执行文件
    #[arg(long, value_name = "PATH", env = "FFMPEG_PATH", default_value = "ffmpeg")]
    pub ffmpeg: String,

    /// yt-dlp 可执行文件
    #[arg(long = "yt-dlp", value_name = "PATH", env = "YTDLP_PATH", default_value = "yt-dlp")]
    pub yt_dlp: String,

    /// 输出调试日志
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// 实际用于挑选视频流的源格式
    pub fn source_format(&self) -> SourceFormat {
        self.source_format
            .unwrap_or_else(|| self.format.default_source())
    }
}

// mp3 只用于仅音频模式
fn parse_video_container(s: &str) -> Result<Container, String> {
    let container: Container = s.parse()?;
    if !container.holds_video() {
        return Err(format!("{} 不能作为视频输出格式（可选 mp4, mkv, webm）", container));
    }
    Ok(container)
}
