pub mod ip;
pub mod password;

use sha2::{Digest, Sha256};

/// slug 长度下限
pub const SLUG_MIN_LEN: usize = 3;
/// slug 长度上限
pub const SLUG_MAX_LEN: usize = 50;

pub fn generate_random_code(length: usize) -> String {
    use std::iter;

    let chars = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

    iter::repeat_with(|| chars[rand::random_range(0..chars.len())] as char)
        .take(length)
        .collect()
}

/// 由标题生成 slug
///
/// 小写、去首尾空白，删除字母数字下划线空白和连字符以外的字符，
/// 空白/下划线/连字符的连续段折叠为单个 `-`，去掉首尾的 `-`。
pub fn slugify(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut pending_sep = false;

    for ch in lowered.chars() {
        if ch.is_whitespace() || ch == '_' || ch == '-' {
            pending_sep = true;
        } else if ch.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('-');
            }
            pending_sep = false;
            out.push(ch);
        }
        // 其他字符直接丢弃，不打断分隔段
    }

    out
}

/// 校验 slug：3..=50 个字符，仅 `[a-z0-9-]`
///
/// 返回面向用户的错误描述。
pub fn validate_slug(slug: &str) -> Result<(), &'static str> {
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        || slug.is_empty()
    {
        return Err("Slug can only contain lowercase letters, numbers, and hyphens");
    }
    if slug.len() < SLUG_MIN_LEN {
        return Err("Slug must be at least 3 characters");
    }
    if slug.len() > SLUG_MAX_LEN {
        return Err("Slug must be less than 50 characters");
    }
    Ok(())
}

/// 客户端地址的 SHA-256 十六进制摘要；地址缺失时对 `unknown` 取摘要
pub fn hash_ip(address: Option<&str>) -> String {
    let source = address.filter(|a| !a.is_empty()).unwrap_or("unknown");
    hex::encode(Sha256::digest(source.as_bytes()))
}

/// 宽松的邮箱格式校验：`local@domain.tld`，不含空白
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

/// 是否为可解析的绝对 URL
pub fn is_valid_url(value: &str) -> bool {
    url::Url::parse(value).is_ok()
}
