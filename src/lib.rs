pub mod common;
pub mod config;
pub mod downloader;
pub mod parser;
pub mod post_process;

pub use config::DownloadConfig;
pub use downloader::VideoDownloader;
pub use downloader::error::DownloadError;
pub use parser::errors::ParseError;
