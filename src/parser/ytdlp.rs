use std::collections::HashMap;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, error, info};
use url::Url;

use super::errors::ParseError;
use super::models::{StreamDescriptor, StreamHandle, StreamKind, VideoMeta};
use super::parser_trait::StreamSource;

// 这些协议需要额外处理分片，直接跳过
const SKIPPED_PROTOCOLS: &[&str] = &["m3u8", "m3u8_native", "http_dash_segments", "mhtml"];

#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: Option<String>,
    webpage_url: Option<String>,
    #[serde(default)]
    formats: Vec<YtDlpFormat>,
}

#[derive(Debug, Deserialize)]
struct YtDlpFormat {
    format_id: Option<String>,
    url: Option<String>,
    ext: Option<String>,
    height: Option<u32>,
    fps: Option<f64>,
    vcodec: Option<String>,
    acodec: Option<String>,
    abr: Option<f64>,
    filesize: Option<u64>,
    filesize_approx: Option<u64>,
    protocol: Option<String>,
    #[serde(default)]
    http_headers: HashMap<String, String>,
}

impl YtDlpFormat {
    fn kind(&self) -> Option<StreamKind> {
        let has_video = match self.vcodec.as_deref() {
            Some(codec) => codec != "none",
            None => self.height.is_some(),
        };
        let has_audio = match self.acodec.as_deref() {
            Some(codec) => codec != "none",
            None => !has_video && self.abr.is_some(),
        };

        match (has_video, has_audio) {
            (true, true) => Some(StreamKind::Progressive),
            (true, false) => Some(StreamKind::VideoOnly),
            (false, true) => Some(StreamKind::AudioOnly),
            (false, false) => None,
        }
    }

    fn into_descriptor(self) -> Option<StreamDescriptor> {
        if let Some(protocol) = self.protocol.as_deref() {
            if SKIPPED_PROTOCOLS.contains(&protocol) {
                return None;
            }
        }
        let kind = self.kind()?;
        let url = self.url?;
        let ext = self.ext?;
        if ext == "mhtml" {
            return None;
        }

        Some(StreamDescriptor {
            format_id: self.format_id.unwrap_or_default(),
            resolution: if kind == StreamKind::AudioOnly {
                None
            } else {
                self.height
            },
            fps: self.fps.map(|f| f.round() as u32),
            ext,
            abr: self.abr,
            kind,
            filesize: self.filesize.or(self.filesize_approx),
            handle: StreamHandle {
                url,
                headers: self.http_headers,
            },
        })
    }
}

/// 解析 `yt-dlp --dump-single-json` 的输出
pub fn parse_info(json: &str) -> Result<VideoMeta, ParseError> {
    let info: YtDlpInfo = serde_json::from_str(json)?;
    let total = info.formats.len();

    let streams: Vec<StreamDescriptor> = info
        .formats
        .into_iter()
        .filter_map(YtDlpFormat::into_descriptor)
        .collect();
    debug!("格式总数: {}, 可用流: {}", total, streams.len());

    let title = info.title.unwrap_or_default();
    if streams.is_empty() {
        return Err(ParseError::NoStreams(title));
    }

    Ok(VideoMeta {
        title,
        webpage_url: info.webpage_url.unwrap_or_default(),
        streams,
    })
}

/// 检查地址是否为 http(s) URL
pub fn validate_url(input: &str) -> Result<Url, ParseError> {
    let url = Url::parse(input.trim())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ParseError::InvalidUrl(format!("不支持的协议: {}", other))),
    }
}

/// 调用外部 yt-dlp 解析视频
#[derive(Debug, Clone)]
pub struct YtDlpSource {
    program: String,
}

impl YtDlpSource {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for YtDlpSource {
    fn default() -> Self {
        Self::new(std::env::var("YTDLP_PATH").unwrap_or_else(|_| "yt-dlp".to_string()))
    }
}

#[async_trait]
impl StreamSource for YtDlpSource {
    async fn resolve(&self, url: &str) -> Result<VideoMeta, ParseError> {
        let url = validate_url(url)?;
        info!("调用 {} 解析: {}", self.program, url);

        let output = Command::new(&self.program)
            .arg("--dump-single-json")
            .arg("--no-playlist")
            .arg("--no-warnings")
            .arg(url.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ParseError::ResolverNotFound {
                program: self.program.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let err_msg = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!("❌ {} 解析失败: {}", self.program, err_msg);
            return Err(ParseError::ResolverFailed {
                code: output.status.code(),
                message: err_msg,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_info(&stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::models::{Container, SourceFormat};
    use crate::parser::stream_selector::enumerate;

    const SAMPLE: &str = r#"{
        "title": "Test / Video?",
        "webpage_url": "https://www.youtube.com/watch?v=abc",
        "formats": [
            {"format_id": "sb0", "url": "https://i.ytimg.com/sb", "ext": "mhtml", "protocol": "mhtml",
             "vcodec": "none", "acodec": "none"},
            {"format_id": "140", "url": "https://media/140", "ext": "m4a", "protocol": "https",
             "vcodec": "none", "acodec": "mp4a.40.2", "abr": 129.5, "filesize": 3000},
            {"format_id": "137", "url": "https://media/137", "ext": "mp4", "protocol": "https",
             "vcodec": "avc1.640028", "acodec": "none", "height": 1080, "fps": 29.97,
             "http_headers": {"User-Agent": "Mozilla/5.0"}},
            {"format_id": "18", "url": "https://media/18", "ext": "mp4", "protocol": "https",
             "vcodec": "avc1.42001E", "acodec": "mp4a.40.2", "height": 360, "fps": 30,
             "filesize_approx": 1234},
            {"format_id": "hls-1", "url": "https://media/hls", "ext": "mp4", "protocol": "m3u8_native",
             "vcodec": "avc1", "acodec": "mp4a", "height": 720}
        ]
    }"#;

    #[test]
    fn parses_and_classifies_formats() {
        let meta = parse_info(SAMPLE).unwrap();
        assert_eq!(meta.title, "Test / Video?");
        let ids: Vec<&str> = meta.streams.iter().map(|s| s.format_id.as_str()).collect();
        assert_eq!(ids, vec!["140", "137", "18"]);

        assert_eq!(meta.streams[0].kind, StreamKind::AudioOnly);
        assert_eq!(meta.streams[0].resolution, None);
        assert_eq!(meta.streams[1].kind, StreamKind::VideoOnly);
        assert_eq!(meta.streams[1].fps, Some(30));
        assert_eq!(
            meta.streams[1].handle.headers.get("User-Agent").map(String::as_str),
            Some("Mozilla/5.0")
        );
        assert_eq!(meta.streams[2].kind, StreamKind::Progressive);
        assert_eq!(meta.streams[2].filesize, Some(1234));
    }

    #[test]
    fn every_source_format_yields_video_streams() {
        let json = r#"{
            "title": "Mixed formats",
            "formats": [
                {"format_id": "251", "url": "https://media/251", "ext": "webm",
                 "vcodec": "none", "acodec": "opus", "abr": 160.0},
                {"format_id": "140", "url": "https://media/140", "ext": "m4a",
                 "vcodec": "none", "acodec": "mp4a.40.2", "abr": 129.5},
                {"format_id": "137", "url": "https://media/137", "ext": "mp4",
                 "vcodec": "avc1.640028", "acodec": "none", "height": 1080},
                {"format_id": "248", "url": "https://media/248", "ext": "webm",
                 "vcodec": "vp9", "acodec": "none", "height": 1080},
                {"format_id": "18", "url": "https://media/18", "ext": "mp4",
                 "vcodec": "avc1.42001E", "acodec": "mp4a.40.2", "height": 360}
            ]
        }"#;
        let meta = parse_info(json).unwrap();

        let mp4 = enumerate(&meta.streams, SourceFormat::Mp4);
        let ids: Vec<&str> = mp4.iter().map(|s| s.format_id.as_str()).collect();
        assert_eq!(ids, vec!["137", "18"]);

        let webm = enumerate(&meta.streams, SourceFormat::Webm);
        assert_eq!(webm.len(), 1);
        assert_eq!(webm[0].format_id, "248");

        // mkv 输出用 mp4 源，webm 输出用 webm 源，都不会落空
        for container in [Container::Mp4, Container::Mkv, Container::Webm] {
            let streams = enumerate(&meta.streams, container.default_source());
            assert!(!streams.is_empty(), "{} 输出没有可用的视频流", container);
        }
    }

    #[test]
    fn no_usable_formats_is_an_error() {
        let json = r#"{"title": "x", "formats": [{"format_id": "sb", "ext": "mhtml", "vcodec": "none", "acodec": "none"}]}"#;
        assert!(matches!(parse_info(json), Err(ParseError::NoStreams(_))));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(parse_info("not json"), Err(ParseError::InvalidResponse(_))));
    }

    #[test]
    fn rejects_non_http_urls() {
        assert!(validate_url("https://youtu.be/abc").is_ok());
        assert!(matches!(validate_url("ftp://host/file"), Err(ParseError::InvalidUrl(_))));
        assert!(matches!(validate_url("not a url"), Err(ParseError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn missing_resolver_program_is_reported() {
        let source = YtDlpSource::new("definitely-not-a-real-yt-dlp-binary");
        let result = source.resolve("https://www.youtube.com/watch?v=abc").await;
        assert!(matches!(result, Err(ParseError::ResolverNotFound { .. })));
    }
}
