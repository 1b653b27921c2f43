use async_trait::async_trait;

use super::{errors::ParseError, models::VideoMeta};

// 定义一个trait，用于把视频地址解析成可下载的流列表
// 其他解析来源（yt-dlp、测试用的假数据等）都实现这个trait
#[async_trait]
pub trait StreamSource: Send + Sync {
    async fn resolve(&self, url: &str) -> Result<VideoMeta, ParseError>;
}
