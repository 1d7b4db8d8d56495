use axum::http::{HeaderName, HeaderValue, Method};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

use crate::config::CorsConfig;

/// 允许跨域读取的响应头（前端可据此关联日志）
const EXPOSED_HEADERS: [HeaderName; 1] = [HeaderName::from_static("x-request-id")];

/// 根据配置构建 CORS 中间件。
///
/// 缩略图接口只读，未配置方法时仅放行 GET/HEAD。
pub fn build_cors_layer(cors: &CorsConfig) -> Option<CorsLayer> {
    if !cors.enabled {
        return None;
    }

    let (any_origin, origins) = parse_list(&cors.allowed_origins, |v| {
        HeaderValue::from_str(v).ok()
    });
    if !any_origin && origins.is_empty() {
        tracing::warn!("CORS 已启用但 allowed_origins 为空，已跳过启用");
        return None;
    }

    let (any_methods, mut methods) = parse_list(&cors.allowed_methods, |v| {
        Method::from_bytes(v.to_ascii_uppercase().as_bytes()).ok()
    });
    if !any_methods && methods.is_empty() {
        methods = vec![Method::GET, Method::HEAD];
    }

    let mut layer = CorsLayer::new().expose_headers(EXPOSED_HEADERS);
    layer = if any_origin {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    };
    layer = if any_methods {
        layer.allow_methods(Any)
    } else {
        layer.allow_methods(methods)
    };

    if let Some(secs) = cors.max_age_secs
        && secs > 0
    {
        layer = layer.max_age(Duration::from_secs(secs));
    }

    Some(layer)
}

/// 解析配置列表："*" 表示任意，空白项忽略，无效项告警后跳过
fn parse_list<T>(values: &[String], parse: impl Fn(&str) -> Option<T>) -> (bool, Vec<T>) {
    let mut any = false;
    let mut parsed = Vec::new();
    for raw in values {
        let value = raw.trim();
        if value.is_empty() {
            continue;
        }
        if value == "*" {
            any = true;
            continue;
        }
        match parse(value) {
            Some(v) => parsed.push(v),
            None => tracing::warn!("CORS 配置含无效值: {}", value),
        }
    }
    (any, parsed)
}
