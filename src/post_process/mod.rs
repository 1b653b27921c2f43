pub mod merger;

use std::path::Path;

use tracing::debug;

/// 删除临时文件，失败（例如文件已不存在）只记录日志
pub async fn cleanup<P: AsRef<Path>>(paths: &[P]) {
    for path in paths {
        let path = path.as_ref();
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!("已删除临时文件: {:?}", path),
            Err(e) => debug!("删除临时文件失败，忽略: {:?}, {}", path, e),
        }
    }
}
