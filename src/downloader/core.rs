use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::error::DownloadError;
use super::progress::ProgressReporter;
use crate::parser::models::StreamDescriptor;

/// 把一个流下载到本地文件，返回写入的字节数
#[async_trait]
pub trait Transfer: Send + Sync {
    async fn fetch(
        &self,
        stream: &StreamDescriptor,
        output_path: &Path,
        progress: &dyn ProgressReporter,
    ) -> Result<u64, DownloadError>;
}

#[derive(Clone)]
pub struct HttpTransfer {
    client: reqwest::Client,
}

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
// 两次读取之间的最长间隔，服务器卡住时不会无限等待
const READ_TIMEOUT: Duration = Duration::from_secs(60);

impl HttpTransfer {
    pub fn new() -> Result<Self, DownloadError> {
        let client = Self::client_builder().build()?;
        Ok(Self { client })
    }

    fn client_builder() -> reqwest::ClientBuilder {
        reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT)
    }

    fn header_map(stream: &StreamDescriptor) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in &stream.handle.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!("忽略无效的请求头: {}", name),
            }
        }
        headers
    }

    fn check_response_status(response: &reqwest::Response, url: &str) -> Result<(), DownloadError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(DownloadError::Transfer(format!(
            "服务器返回 {}: {}",
            status, url
        )))
    }
}

#[async_trait]
impl Transfer for HttpTransfer {
    async fn fetch(
        &self,
        stream: &StreamDescriptor,
        output_path: &Path,
        progress: &dyn ProgressReporter,
    ) -> Result<u64, DownloadError> {
        let url = &stream.handle.url;
        debug!("开始下载二进制文件: 格式ID={}", stream.format_id);

        let response = self
            .client
            .get(url)
            .headers(Self::header_map(stream))
            .send()
            .await
            .map_err(|e| DownloadError::Transfer(e.to_string()))?;
        Self::check_response_status(&response, url)?;

        let total_size = response
            .content_length()
            .filter(|len| *len > 0)
            .or(stream.filesize)
            .unwrap_or(0);

        let mut file = tokio::fs::File::create(output_path).await?;
        let mut body = response.bytes_stream();

        let mut downloaded = 0u64;
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| DownloadError::Transfer(e.to_string()))?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            progress.on_progress(downloaded, total_size);
        }
        file.flush().await?;

        info!("✅ 下载完成: {:?} ({} 字节)", output_path, downloaded);
        Ok(downloaded)
    }
}
