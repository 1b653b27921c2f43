use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 流的类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamKind {
    Progressive, // 音视频合一
    VideoOnly,   // 仅视频
    AudioOnly,   // 仅音频
}

/// 实际下载所需的句柄（直链 + 必要的请求头）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamHandle {
    pub url: String,
    pub headers: HashMap<String, String>,
}

/// 一个可下载的清晰度/格式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub format_id: String,
    pub resolution: Option<u32>, // 像素高度
    pub fps: Option<u32>,
    pub ext: String,
    pub abr: Option<f64>, // 平均音频码率 kbit/s
    pub kind: StreamKind,
    pub filesize: Option<u64>,
    pub handle: StreamHandle,
}

impl StreamDescriptor {
    pub fn is_progressive(&self) -> bool {
        self.kind == StreamKind::Progressive
    }

    pub fn is_audio_only(&self) -> bool {
        self.kind == StreamKind::AudioOnly
    }

    pub fn has_video(&self) -> bool {
        matches!(self.kind, StreamKind::Progressive | StreamKind::VideoOnly)
    }

    /// 用于列表展示的描述，如 `1080p (30 FPS, Video-only)`
    pub fn label(&self) -> String {
        let resolution = self
            .resolution
            .map(|r| format!("{}p", r))
            .unwrap_or_else(|| "N/A".to_string());
        let fps = self
            .fps
            .map(|f| f.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        let type_info = if self.is_progressive() {
            "Video+Audio"
        } else {
            "Video-only"
        };
        format!("{} ({} FPS, {})", resolution, fps, type_info)
    }
}

/// 解析后的视频信息
#[derive(Debug, Clone, PartialEq)]
pub struct VideoMeta {
    pub title: String,
    pub webpage_url: String,
    pub streams: Vec<StreamDescriptor>, // 保持解析器的原始顺序
}

// 解析结果中可选的视频源格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SourceFormat {
    #[default]
    Mp4,
    Webm,
}

impl SourceFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for SourceFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "mp4" => Ok(Self::Mp4),
            "webm" => Ok(Self::Webm),
            other => Err(format!("不支持的视频源格式: {}（可选 mp4, webm）", other)),
        }
    }
}

// 输出容器格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Container {
    #[default]
    Mp4,
    Mkv,
    Webm,
    Mp3,
}

impl Container {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mkv => "mkv",
            Self::Webm => "webm",
            Self::Mp3 => "mp3",
        }
    }

    /// 能否作为视频下载的输出容器
    pub fn holds_video(&self) -> bool {
        !matches!(self, Self::Mp3)
    }

    /// 未指定视频源格式时使用的默认值，webm 只能直接复制 VP9/AV1 视频
    pub fn default_source(&self) -> SourceFormat {
        match self {
            Self::Webm => SourceFormat::Webm,
            _ => SourceFormat::Mp4,
        }
    }

    /// 该容器对应的标准音频编码（传给 ffmpeg 的 `-c:a`）
    pub fn audio_codec(&self) -> &'static str {
        match self {
            Self::Mp4 | Self::Mkv => "aac",
            Self::Webm => "libopus",
            Self::Mp3 => "libmp3lame",
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for Container {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "mp4" => Ok(Self::Mp4),
            "mkv" => Ok(Self::Mkv),
            "webm" => Ok(Self::Webm),
            "mp3" => Ok(Self::Mp3),
            other => Err(format!("不支持的容器格式: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(kind: StreamKind, resolution: Option<u32>, fps: Option<u32>) -> StreamDescriptor {
        StreamDescriptor {
            format_id: "137".to_string(),
            resolution,
            fps,
            ext: "mp4".to_string(),
            abr: None,
            kind,
            filesize: None,
            handle: StreamHandle::default(),
        }
    }

    #[test]
    fn label_shows_type_and_missing_values() {
        let progressive = stream(StreamKind::Progressive, Some(720), Some(30));
        assert_eq!(progressive.label(), "720p (30 FPS, Video+Audio)");

        let video_only = stream(StreamKind::VideoOnly, None, None);
        assert_eq!(video_only.label(), "N/A (N/A FPS, Video-only)");
    }

    #[test]
    fn container_parsing_and_codecs() {
        assert_eq!("MP4".parse::<Container>(), Ok(Container::Mp4));
        assert_eq!(".webm".parse::<Container>(), Ok(Container::Webm));
        assert!("avi".parse::<Container>().is_err());
        assert_eq!(Container::Mp4.audio_codec(), "aac");
        assert_eq!(Container::Webm.audio_codec(), "libopus");
        assert_eq!(Container::default().to_string(), "mp4");
    }

    #[test]
    fn source_format_is_separate_from_output() {
        assert_eq!("mp4".parse::<SourceFormat>(), Ok(SourceFormat::Mp4));
        assert_eq!("WEBM".parse::<SourceFormat>(), Ok(SourceFormat::Webm));
        assert!("mkv".parse::<SourceFormat>().is_err());
        assert!("mp3".parse::<SourceFormat>().is_err());

        assert_eq!(Container::Mkv.default_source(), SourceFormat::Mp4);
        assert_eq!(Container::Webm.default_source(), SourceFormat::Webm);
        assert!(Container::Mkv.holds_video());
        assert!(!Container::Mp3.holds_video());
    }
}
