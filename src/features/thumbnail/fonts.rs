use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, OnceLock};

use rusttype::Font;
use serde::{Deserialize, Serialize};

use crate::config::{AppConfig, FontConfig};
use crate::error::ThumbnailError;

/// 字重（每个文字块固定使用其中一种）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    Regular,
    Medium,
    Bold,
}

impl FontStyle {
    pub const ALL: [FontStyle; 3] = [FontStyle::Regular, FontStyle::Medium, FontStyle::Bold];

    pub fn as_str(self) -> &'static str {
        match self {
            FontStyle::Regular => "regular",
            FontStyle::Medium => "medium",
            FontStyle::Bold => "bold",
        }
    }
}

/// 已解析的字体句柄
pub type FontHandle = Font<'static>;

/// 解析字体程序字节
pub fn load_font(bytes: Vec<u8>) -> Result<FontHandle, ThumbnailError> {
    if bytes.is_empty() {
        return Err(ThumbnailError::FontLoad("字体数据为空".to_string()));
    }
    Font::try_from_vec(bytes)
        .ok_or_else(|| ThumbnailError::FontLoad("无法解析 TrueType/OpenType 数据".to_string()))
}

/// 按字重索引的只读字体表。
///
/// 初始化后不再修改，可在并发渲染间直接共享引用；
/// 缺失的字重在渲染时对应文字块直接跳过。
#[derive(Default)]
pub struct FontRegistry {
    fonts: HashMap<FontStyle, FontHandle>,
}

impl FontRegistry {
    /// 不含任何字体的注册表（所有文字块都会被跳过）
    pub fn empty() -> Self {
        Self::default()
    }

    /// 从字体目录加载三种字重；读取或解析失败只告警，不中断
    pub fn from_config(config: &FontConfig) -> Self {
        let mut fonts = HashMap::new();
        for style in FontStyle::ALL {
            let path = config.path_for(style);
            let loaded = fs::read(&path)
                .map_err(|e| ThumbnailError::FontLoad(format!("{}: {e}", path.display())))
                .and_then(load_font);
            match loaded {
                Ok(font) => {
                    tracing::debug!("字体已加载: {} <- {:?}", style.as_str(), path);
                    fonts.insert(style, font);
                }
                Err(e) => {
                    tracing::warn!("字重 {} 不可用，对应文字块将被跳过: {}", style.as_str(), e);
                }
            }
        }
        Self { fonts }
    }

    /// 注册（或替换）一个字重
    pub fn with_font(mut self, style: FontStyle, font: FontHandle) -> Self {
        self.fonts.insert(style, font);
        self
    }

    pub fn get(&self, style: FontStyle) -> Option<&FontHandle> {
        self.fonts.get(&style)
    }

    /// 已成功加载的字重
    pub fn loaded_styles(&self) -> Vec<FontStyle> {
        FontStyle::ALL
            .into_iter()
            .filter(|s| self.fonts.contains_key(s))
            .collect()
    }
}

// 全局字体注册表单例
static GLOBAL_FONT_REGISTRY: OnceLock<Arc<FontRegistry>> = OnceLock::new();

/// 获取全局字体注册表（首次调用时按全局配置加载）
pub fn get_global_font_registry() -> Arc<FontRegistry> {
    GLOBAL_FONT_REGISTRY
        .get_or_init(|| Arc::new(FontRegistry::from_config(&AppConfig::global().fonts)))
        .clone()
}

/// 在常见系统路径中找一个可用字体，供依赖真实字形的测试使用。
///
/// 这些测试标记为 `#[ignore]`，需 `cargo test -- --ignored` 显式运行；找不到字体时直接失败。
#[cfg(test)]
pub(crate) fn system_font() -> FontHandle {
    const FONT_SEARCH_PATHS: &[&str] = &[
        "resources/fonts/Go-Regular.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ];
    FONT_SEARCH_PATHS
        .iter()
        .filter_map(|p| fs::read(p).ok())
        .find_map(|bytes| load_font(bytes).ok())
        .unwrap_or_else(|| panic!("未找到可用字体，已搜索: {FONT_SEARCH_PATHS:?}"))
}
