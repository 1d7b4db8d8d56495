use std::path::PathBuf;
use std::sync::Arc;

use image::RgbaImage;

use super::fonts::FontRegistry;
use super::renderer;
use super::sink::{self, EmitReport, FileSink, ThumbnailSink};
use super::types::ThumbnailSpec;
use crate::config::{AppConfig, LayoutConfig};
use crate::error::ThumbnailError;

/// 缩略图服务：持有版式、资源路径与只读字体表，渲染本身无共享可变状态
pub struct ThumbnailService {
    layout: LayoutConfig,
    author: String,
    avatar_path: PathBuf,
    output_path: PathBuf,
    fonts: Arc<FontRegistry>,
}

impl ThumbnailService {
    pub fn new(
        layout: LayoutConfig,
        author: impl Into<String>,
        avatar_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        fonts: Arc<FontRegistry>,
    ) -> Self {
        Self {
            layout,
            author: author.into(),
            avatar_path: avatar_path.into(),
            output_path: output_path.into(),
            fonts,
        }
    }

    pub fn from_config(config: &AppConfig, fonts: Arc<FontRegistry>) -> Self {
        Self::new(
            config.layout.clone(),
            config.thumbnail.author.clone(),
            config.avatar_path(),
            config.output_path(),
            fonts,
        )
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// 组装渲染输入（署名固定）
    pub fn spec(&self, topic: impl Into<String>, title: impl Into<String>) -> ThumbnailSpec {
        ThumbnailSpec {
            topic: topic.into(),
            title: title.into(),
            author: self.author.clone(),
        }
    }

    fn read_avatar(&self) -> Result<Vec<u8>, ThumbnailError> {
        std::fs::read(&self.avatar_path).map_err(|e| {
            ThumbnailError::AvatarRead(format!("{}: {e}", self.avatar_path.display()))
        })
    }

    /// 渲染一张缩略图（每次重新读取头像源）
    pub fn render(&self, spec: &ThumbnailSpec) -> Result<RgbaImage, ThumbnailError> {
        let avatar = self.read_avatar()?;
        renderer::render_thumbnail(spec, &self.layout, &self.fonts, &avatar)
    }

    /// 渲染并输出到持久化产物与给定的响应目标。
    ///
    /// 渲染失败时直接返回错误，任何目标都不会被写入。
    pub fn render_and_emit(
        &self,
        spec: &ThumbnailSpec,
        response: &mut dyn ThumbnailSink,
    ) -> Result<EmitReport, ThumbnailError> {
        let canvas = self.render(spec)?;
        let mut artifact = FileSink::new(&self.output_path);
        Ok(sink::emit(&canvas, &mut [&mut artifact, response]))
    }
}
