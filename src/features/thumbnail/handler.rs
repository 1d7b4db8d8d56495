use axum::{
    Router,
    extract::{Query, State, rejection::QueryRejection},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
    routing::get,
};
use std::time::Instant;

use super::sink::ResponseSink;
use super::types::ThumbnailQuery;
use crate::{error::AppError, state::AppState};

/// 响应目标名称（与 `ResponseSink::name` 一致）
const RESPONSE_SINK: &str = "response";

#[utoipa::path(
    get,
    path = "/thumbnails",
    summary = "生成分享缩略图",
    description = "按固定版式渲染 1200×630 的分享缩略图（主题、自动换行的标题、署名、圆形头像），同时覆盖写入服务端产物文件并以 PNG 返回。",
    params(ThumbnailQuery),
    responses(
        (status = 200, description = "PNG bytes of the thumbnail", content_type = "image/png"),
        (status = 422, description = "查询参数无法解析（例如重复的 topic/title）", body = AppError),
        (status = 500, description = "头像不可用或编码失败（编码失败时无响应体）", body = AppError)
    ),
    tag = "Thumbnail"
)]
pub async fn get_thumbnail(
    State(state): State<AppState>,
    query: Result<Query<ThumbnailQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let t_total = Instant::now();
    let Query(q) = query.map_err(|e| AppError::Validation(e.body_text()))?;

    // 限制并发渲染数量（CPU 密集）
    let permit = state
        .render_semaphore
        .clone()
        .acquire_owned()
        .await
        .map_err(|e| AppError::Internal(format!("获取渲染许可失败: {e}")))?;
    let t_wait = t_total.elapsed();

    let service = state.thumbnails.clone();
    let spec = service.spec(q.topic, q.title);
    let (result, response_sink) = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        let mut response_sink = ResponseSink::new();
        let result = service.render_and_emit(&spec, &mut response_sink);
        (result, response_sink)
    })
    .await
    .map_err(|e| AppError::Internal(format!("渲染任务异常退出: {e}")))?;

    let mut report = result?;
    if let Some(Err(e)) = report.take(RESPONSE_SINK) {
        return Err(e.into());
    }
    let body = response_sink
        .into_body()
        .ok_or_else(|| AppError::Internal("响应体未生成".to_string()))?;

    tracing::info!(
        "缩略图请求完成: 等待许可={:?}, 总计={:?}, 大小={}B, 产物写入={}",
        t_wait,
        t_total.elapsed(),
        body.len(),
        if report.all_ok() { "ok" } else { "failed" }
    );

    let mut res = body.into_response();
    res.headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
    res.headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Ok(res)
}

/// 创建缩略图路由
pub fn create_thumbnail_router() -> Router<AppState> {
    Router::new().route("/thumbnails", get(get_thumbnail))
}
