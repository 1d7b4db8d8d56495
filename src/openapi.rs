use utoipa::openapi::server::{ServerBuilder, ServerVariableBuilder};
use utoipa::{Modify, OpenApi};

/// 为 Swagger UI 提供正确的“业务接口前缀”Servers 配置。
///
/// - 业务接口默认前缀为 `/api`（对应 `config.api.prefix` / `APP_API__PREFIX`）。
/// - `/health` 不带前缀，因此额外提供 `/` 作为备用 server。
struct ApiServers;

impl Modify for ApiServers {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let api = ServerBuilder::new()
            .url("{api_prefix}")
            .description(Some("业务接口（默认 /api）"))
            .parameter(
                "api_prefix",
                ServerVariableBuilder::new()
                    .default_value("/api")
                    .description(Some(
                        "业务接口前缀：对应 config.api.prefix（可通过 APP_API__PREFIX 覆盖）",
                    )),
            )
            .build();

        let root = ServerBuilder::new()
            .url("/")
            .description(Some("根路径（用于 /health 等不带前缀接口）"))
            .build();

        openapi.servers = Some(vec![api, root]);
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::features::health::handler::health_check,
        crate::features::thumbnail::handler::get_thumbnail,
    ),
    components(schemas(
        crate::error::AppError,
        crate::error::ThumbnailError,
        crate::error::ProblemDetails,
        crate::features::health::HealthResponse,
    )),
    modifiers(&ApiServers),
    tags(
        (
            name = "Thumbnail",
            description = "分享缩略图：主题、标题、署名与圆形头像合成的 1200×630 PNG。"
        ),
        (name = "Health", description = "健康检查：服务探活。"),
    ),
    info(
        title = "Thumbnail Backend API",
        version = env!("CARGO_PKG_VERSION"),
        description = "分享缩略图渲染服务（Axum + utoipa）。注意：除 /health 外，业务接口实际挂载在 `config.api.prefix`（默认 /api）下，OpenAPI 的 paths 不包含该前缀。"
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::ApiDoc;
    use utoipa::OpenApi;

    #[test]
    fn openapi_lists_thumbnail_and_health_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/thumbnails"));
        assert!(doc.paths.paths.contains_key("/health"));
        let servers = doc.servers.expect("servers");
        assert_eq!(servers.len(), 2);
    }
}
