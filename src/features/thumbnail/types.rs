use image::Rgba;
use serde::{Deserialize, Serialize};

use super::fonts::FontStyle;
use super::layout::LaidOutLine;

/// 缩略图请求参数（Query）
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ThumbnailQuery {
    /// 顶部主题标签（单行）
    #[serde(default)]
    #[param(example = "News")]
    pub topic: String,
    /// 标题（超宽时自动换行）
    #[serde(default)]
    #[param(example = "A Short Headline")]
    pub title: String,
}

/// 一次渲染的文字输入；署名为固定配置值
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailSpec {
    pub topic: String,
    pub title: String,
    pub author: String,
}

/// 文字块种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Topic,
    Title,
    Author,
}

impl BlockKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BlockKind::Topic => "topic",
            BlockKind::Title => "title",
            BlockKind::Author => "author",
        }
    }
}

/// 排版完成、待绘制的文字块
#[derive(Debug, Clone)]
pub struct TextBlock {
    pub kind: BlockKind,
    pub font: FontStyle,
    pub size: f32,
    pub color: Rgba<u8>,
    /// 仅标题换行
    pub wrap_width: Option<f32>,
    pub lines: Vec<LaidOutLine>,
}
