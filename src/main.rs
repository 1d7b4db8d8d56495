use axum::{Router, routing::get};
use thumb_backend::config::AppConfig;
use thumb_backend::cors::build_cors_layer;
use thumb_backend::features::health::health_check;
use thumb_backend::features::thumbnail::{create_thumbnail_router, get_global_font_registry};
use thumb_backend::openapi::ApiDoc;
use thumb_backend::request_id::request_id_middleware;
use thumb_backend::startup::run_startup_checks;
use thumb_backend::state::AppState;
use thumb_backend::ShutdownManager;
use tower_http::compression::CompressionLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn compression_predicate() -> impl tower_http::compression::predicate::Predicate {
    use tower_http::compression::predicate::{NotForContentType, Predicate, SizeAbove};

    // 明确排除不该压缩的响应：缩略图 PNG 本身已压缩，再压一次只浪费 CPU。
    // 文档页与 JSON 错误体仍按默认阈值（32B）压缩。
    SizeAbove::default()
        .and(NotForContentType::GRPC)
        .and(NotForContentType::IMAGES)
        .and(NotForContentType::SSE)
        .and(NotForContentType::const_new("application/octet-stream"))
}

#[cfg(test)]
mod compression_predicate_tests {
    use super::compression_predicate;
    use axum::body::Body;
    use axum::http::{Response as HttpResponse, header};
    use tower_http::compression::predicate::Predicate;

    fn should_compress_for(ct: &str) -> bool {
        let body_bytes = vec![b'x'; 2048];
        let resp = HttpResponse::builder()
            .header(header::CONTENT_TYPE, ct)
            .body(Body::from(body_bytes))
            .unwrap();
        compression_predicate().should_compress(&resp)
    }

    #[test]
    fn compression_predicate_skips_png() {
        assert!(!should_compress_for("image/png"));
    }

    #[test]
    fn compression_predicate_allows_problem_json() {
        assert!(should_compress_for("application/problem+json"));
        assert!(should_compress_for("application/json"));
    }

    #[test]
    fn compression_predicate_disables_binary_downloads() {
        assert!(!should_compress_for("application/octet-stream"));
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "thumb_backend=info,tower_http=info".into()),
        )
        .init();

    // 创建优雅退出管理器
    let shutdown_manager = ShutdownManager::new();

    if let Err(e) = AppConfig::init_global() {
        tracing::error!("配置初始化失败: {}", e);
        std::process::exit(1);
    }
    let config = AppConfig::global();
    tracing::debug!("日志级别配置: {}", config.logging.level);

    // 启动信号处理器
    if let Err(e) = shutdown_manager.start_signal_handler() {
        tracing::error!("信号处理器启动失败: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run_startup_checks(config).await {
        tracing::error!("启动检查失败: {}", e);
        std::process::exit(1);
    }

    let fonts = get_global_font_registry();
    let app_state = AppState::new(config, fonts);

    let mut app = Router::<AppState>::new()
        .route("/health", get(health_check))
        .nest(&config.api.prefix, create_thumbnail_router())
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state);

    if let Some(cors) = build_cors_layer(&config.cors) {
        app = app.layer(cors);
    }
    app = app.layer(CompressionLayer::new().compress_when(compression_predicate()));
    // 最外层：后续所有层与处理器的日志都带 request_id
    app = app.layer(axum::middleware::from_fn(request_id_middleware));

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("绑定地址失败 {}: {}", addr, e);
            std::process::exit(1);
        });

    tracing::info!("Server: http://{}", addr);
    tracing::info!("Docs: http://{}/docs", addr);
    tracing::info!("Health: http://{}/health", addr);
    tracing::info!(
        "Thumbnail API: http://{}{}/thumbnails",
        addr,
        config.api.prefix
    );
    tracing::info!("产物路径: {:?}", config.output_path());

    let shutdown_timeout = config.shutdown.timeout_duration();
    let signal_manager = shutdown_manager.clone();
    let graceful = axum::serve(listener, app).with_graceful_shutdown(async move {
        let reason = signal_manager.wait_for_shutdown().await;
        tracing::info!("接收到退出信号: {:?}，开始优雅关闭HTTP服务器...", reason);
    });

    // 收到信号后给进行中的请求留出超时窗口，超时则强制退出
    let server = tokio::spawn(async move { graceful.await });
    let result = tokio::select! {
        res = server => res,
        _ = async {
            shutdown_manager.wait_for_shutdown().await;
            tokio::time::sleep(shutdown_timeout).await;
        } => {
            tracing::warn!("优雅退出超时（{}秒），强制退出", config.shutdown.timeout_secs);
            std::process::exit(1)
        }
    };

    match result {
        Ok(Ok(())) => tracing::info!("服务器已优雅关闭"),
        Ok(Err(e)) => {
            tracing::error!("服务器运行错误: {}", e);
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!("服务器任务异常退出: {}", e);
            std::process::exit(1);
        }
    }
}
