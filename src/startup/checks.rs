use crate::config::AppConfig;
use crate::error::AppError;
use crate::features::thumbnail::FontStyle;
use std::fs;
use std::path::Path;

/// 执行启动检查
///
/// 1. 确保产物输出目录存在
/// 2. 检查头像源与字体文件（仅告警，不阻断启动）
/// 3. 预热字体表
pub async fn run_startup_checks(config: &AppConfig) -> Result<(), AppError> {
    tracing::info!("🔍 开始执行启动检查...");

    ensure_output_dir(&config.output_path())?;
    ensure_avatar_source(&config.avatar_path());
    ensure_font_resources(config);

    // 预热字体表，避免首个请求承担字体解析开销
    let t_prewarm = std::time::Instant::now();
    if let Err(e) = tokio::task::spawn_blocking(crate::features::thumbnail::prewarm_fonts).await {
        tracing::warn!("字体预热任务失败: {}", e);
    } else {
        tracing::info!("字体预热完成: {}ms", t_prewarm.elapsed().as_millis());
    }

    tracing::info!("✅ 启动检查完成");
    Ok(())
}

/// 确保产物文件所在目录存在
fn ensure_output_dir(output_path: &Path) -> Result<(), AppError> {
    let Some(dir) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };

    if dir.exists() {
        tracing::info!("✅ 产物目录已存在: {:?}", dir);
        return Ok(());
    }

    tracing::warn!("📁 未找到产物目录，正在创建: {:?}", dir);
    fs::create_dir_all(dir)
        .map_err(|e| AppError::Internal(format!("创建产物目录失败: {e}")))?;
    tracing::info!("✅ 产物目录创建成功");
    Ok(())
}

/// 头像在每次请求时读取；启动时缺失只告警，请求会以 500 失败
fn ensure_avatar_source(avatar_path: &Path) {
    if avatar_path.is_file() {
        tracing::info!("✅ 头像源存在: {:?}", avatar_path);
    } else {
        tracing::warn!("⚠️ 未找到头像源: {:?}，缩略图请求将失败直到文件就绪", avatar_path);
    }
}

/// 确保字体文件存在（缺失时对应文字块不绘制）
fn ensure_font_resources(config: &AppConfig) {
    for style in FontStyle::ALL {
        let path = config.fonts.path_for(style);
        if path.is_file() {
            tracing::info!("字体存在: {:?}", path);
        } else {
            tracing::warn!("未找到字体文件 ({}): {:?}", style.as_str(), path);
        }
    }
}
