use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// 应用统一错误类型
#[derive(Error, Debug, utoipa::ToSchema)]
pub enum AppError {
    /// 参数校验错误
    #[error("参数校验错误: {0}")]
    Validation(String),

    /// 内部服务器错误
    #[error("内部错误: {0}")]
    Internal(String),

    /// 缩略图渲染错误
    #[error("缩略图错误: {0}")]
    Thumbnail(#[from] ThumbnailError),
}

/// 缩略图渲染/输出错误类型
#[derive(Error, Debug, utoipa::ToSchema)]
pub enum ThumbnailError {
    /// 字体读取或解析失败（对应文字块降级跳过，不向调用方暴露）
    #[error("字体加载失败: {0}")]
    FontLoad(String),

    /// 头像源文件读取失败
    #[error("头像读取失败: {0}")]
    AvatarRead(String),

    /// 头像解码失败
    #[error("头像解码失败: {0}")]
    AvatarDecode(String),

    /// 画布尺寸无效（无法分配）
    #[error("画布尺寸无效: {0}x{1}")]
    InvalidCanvas(u32, u32),

    /// PNG 编码失败
    #[error("PNG 编码失败: {0}")]
    Encode(String),

    /// 输出目标写入失败
    #[error("写入 {sink} 失败: {reason}")]
    SinkWrite {
        /// 输出目标名称
        sink: String,
        /// 失败原因
        reason: String,
    },
}

/// RFC7807 风格的错误响应（Problem Details）。
///
/// 设计目标：
/// - 让所有 API 错误返回结构化 JSON，便于调用方稳定处理
/// - 与 OpenAPI 一致（content-type = application/problem+json）
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    /// 问题类型（URI）。若无更细分的类型，可使用 about:blank。
    #[serde(rename = "type")]
    #[schema(example = "about:blank")]
    pub type_url: String,

    /// 简短标题，用于概括错误。
    #[schema(example = "Internal Server Error")]
    pub title: String,

    /// HTTP 状态码（与响应 status 一致）。
    #[schema(example = 500)]
    pub status: u16,

    /// 人类可读的详细信息（尽量稳定，不建议依赖解析）。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// 稳定的错误码，用于程序化处理。
    #[schema(example = "THUMBNAIL_AVATAR_UNAVAILABLE")]
    pub code: String,

    /// 可选：请求追踪 ID。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            // 头像/字体/编码/写入均属于服务端资源问题
            AppError::Thumbnail(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn stable_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_FAILED",
            AppError::Internal(_) => "INTERNAL_ERROR",
            AppError::Thumbnail(e) => match e {
                ThumbnailError::FontLoad(_) => "THUMBNAIL_FONT_UNAVAILABLE",
                ThumbnailError::AvatarRead(_) | ThumbnailError::AvatarDecode(_) => {
                    "THUMBNAIL_AVATAR_UNAVAILABLE"
                }
                ThumbnailError::InvalidCanvas(..) => "THUMBNAIL_INVALID_LAYOUT",
                ThumbnailError::Encode(_) => "THUMBNAIL_ENCODE_FAILED",
                ThumbnailError::SinkWrite { .. } => "THUMBNAIL_SINK_FAILED",
            },
        }
    }

    fn title(&self) -> &'static str {
        match self.status_code() {
            StatusCode::UNPROCESSABLE_ENTITY => "Validation Failed",
            StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error",
            _ => "Error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 编码失败时只返回通用 500，不附带任何响应体
        if matches!(self, AppError::Thumbnail(ThumbnailError::Encode(_))) {
            return status.into_response();
        }

        let problem = ProblemDetails {
            type_url: "about:blank".to_string(),
            title: self.title().to_string(),
            status: status.as_u16(),
            detail: Some(self.to_string()),
            code: self.stable_code().to_string(),
            request_id: crate::request_id::current_request_id(),
        };

        let mut res = Json(problem).into_response();
        *res.status_mut() = status;
        res.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        res
    }
}

// =============== Error conversions for common external errors ===============

impl From<image::ImageError> for ThumbnailError {
    fn from(err: image::ImageError) -> Self {
        ThumbnailError::AvatarDecode(err.to_string())
    }
}

impl From<png::EncodingError> for ThumbnailError {
    fn from(err: png::EncodingError) -> Self {
        ThumbnailError::Encode(err.to_string())
    }
}
