//! 客户端地址提取
//!
//! 仅当直连方是可信代理时才采信 X-Forwarded-For / X-Real-IP，
//! 否则使用连接地址，防止伪造。

use std::net::{IpAddr, SocketAddr};

use actix_web::HttpRequest;
use actix_web::http::header::HeaderMap;
use tracing::debug;

/// 检查 IP 是否为私有地址或 localhost
pub fn is_private_or_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback(),
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || (v6.segments()[0] & 0xfe00) == 0xfc00 // fc00::/7
                || (v6.segments()[0] & 0xffc0) == 0xfe80 // fe80::/10
        }
    }
}

/// CIDR 检查
pub fn ip_in_cidr(ip: &IpAddr, cidr: &str) -> bool {
    let Some((network, prefix_len)) = cidr.split_once('/') else {
        return false;
    };
    let (Ok(prefix_len), Ok(network)) = (prefix_len.parse::<u32>(), network.parse::<IpAddr>())
    else {
        return false;
    };

    match (ip, network) {
        (IpAddr::V4(ip), IpAddr::V4(net)) if prefix_len <= 32 => {
            let mask = u32::MAX.checked_shl(32 - prefix_len).unwrap_or(0);
            (u32::from(*ip) & mask) == (u32::from(net) & mask)
        }
        (IpAddr::V6(ip), IpAddr::V6(net)) if prefix_len <= 128 => {
            let mask = u128::MAX.checked_shl(128 - prefix_len).unwrap_or(0);
            (u128::from(*ip) & mask) == (u128::from(net) & mask)
        }
        _ => false,
    }
}

fn parse_peer(peer: &str) -> Option<IpAddr> {
    peer.parse::<SocketAddr>()
        .map(|s| s.ip())
        .ok()
        .or_else(|| peer.parse::<IpAddr>().ok())
}

/// 连接方是否可信代理
///
/// `trusted_proxies` 为空时，私有地址与 localhost 视为代理。
pub fn is_trusted_proxy(peer: &str, trusted_proxies: &[String]) -> bool {
    let Some(ip) = parse_peer(peer) else {
        return false;
    };

    if trusted_proxies.is_empty() {
        return is_private_or_local(&ip);
    }

    trusted_proxies.iter().any(|proxy| {
        if proxy.contains('/') {
            ip_in_cidr(&ip, proxy)
        } else {
            proxy.parse::<IpAddr>().is_ok_and(|p| p == ip)
        }
    })
}

/// 从请求头提取转发的 IP（X-Forwarded-For 首项，其次 X-Real-IP）
pub fn forwarded_ip_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// 提取客户端地址，无法确定时返回 None
pub fn extract_client_ip(req: &HttpRequest, trusted_proxies: &[String]) -> Option<String> {
    let conn_info = req.connection_info();
    let Some(peer) = conn_info.peer_addr() else {
        return forwarded_ip_from_headers(req.headers());
    };

    if is_trusted_proxy(peer, trusted_proxies)
        && let Some(real_ip) = forwarded_ip_from_headers(req.headers())
    {
        debug!("Trusted proxy {} forwarded for {}", peer, real_ip);
        return Some(real_ip);
    }

    parse_peer(peer)
        .map(|ip| ip.to_string())
        .or_else(|| Some(peer.to_string()))
}
