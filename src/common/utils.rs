use lazy_static::lazy_static;
use regex::Regex;
use uuid::Uuid;

lazy_static! {
    // Windows 文件名中不允许的字符
    static ref INVALID_CHARS: Regex = Regex::new(r#"[\\/*?:"<>|]"#).unwrap();
}

/// 把标题中的非法文件名字符替换为 `_`
pub fn sanitize_filename(name: &str) -> String {
    INVALID_CHARS.replace_all(name, "_").into_owned()
}

/// 生成 32 位十六进制的唯一标识，避免重复下载时覆盖文件
pub fn unique_token() -> String {
    Uuid::new_v4().simple().to_string()
}
