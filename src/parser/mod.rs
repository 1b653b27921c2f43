use std::sync::Arc;

use errors::ParseError;
use models::VideoMeta;
use parser_trait::StreamSource;
use tracing::{debug, error, info};

pub mod errors;
pub mod models;
pub mod parser_trait;
pub mod stream_selector;
pub mod ytdlp;

pub struct VideoParser {
    source: Arc<dyn StreamSource>,
}

impl VideoParser {
    pub fn new(source: Arc<dyn StreamSource>) -> Self {
        Self { source }
    }

    // 解析入口
    pub async fn parse(&self, url: &str) -> Result<VideoMeta, ParseError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ParseError::InvalidUrl("URL不能为空".to_string()));
        }

        info!("开始解析: {}", url);
        let meta = self.source.resolve(url).await.map_err(|e| {
            error!("解析失败: {}", e);
            e
        })?;
        debug!("解析结果: 标题={}, 流数量={}", meta.title, meta.streams.len());
        Ok(meta)
    }
}
