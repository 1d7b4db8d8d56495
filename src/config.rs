use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::features::thumbnail::fonts::FontStyle;

/// 全局配置单例
static CONFIG: OnceCell<AppConfig> = OnceCell::new();

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3939,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（未设置 RUST_LOG 时生效）
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API 路由前缀
    pub prefix: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            prefix: "/api".to_string(),
        }
    }
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// 是否启用 CORS
    #[serde(default = "CorsConfig::default_enabled")]
    pub enabled: bool,
    /// 允许的 Origin 列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// 允许的方法列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_methods: Vec<String>,
    /// 预检缓存时间（秒）
    #[serde(default)]
    pub max_age_secs: Option<u64>,
}

impl CorsConfig {
    fn default_enabled() -> bool {
        false
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            allowed_origins: Vec::new(),
            allowed_methods: Vec::new(),
            max_age_secs: None,
        }
    }
}

/// 缩略图服务配置（资源路径与并发）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailConfig {
    /// 署名文字（固定，不接受调用方传入）
    #[serde(default = "ThumbnailConfig::default_author")]
    pub author: String,
    /// 头像源文件路径
    #[serde(default = "ThumbnailConfig::default_avatar_path")]
    pub avatar_path: String,
    /// 持久化产物路径（每次渲染覆盖）
    #[serde(default = "ThumbnailConfig::default_output_path")]
    pub output_path: String,
    /// 并发渲染许可数（0=自动，取 CPU 核心数）
    #[serde(default)]
    pub max_parallel: u32,
}

impl ThumbnailConfig {
    fn default_author() -> String {
        "piklr".to_string()
    }
    fn default_avatar_path() -> String {
        "resources/avatar.jpg".to_string()
    }
    fn default_output_path() -> String {
        "resources/output/thumbnail.png".to_string()
    }

    /// 实际生效的并发许可数
    pub fn effective_parallelism(&self) -> usize {
        if self.max_parallel == 0 {
            num_cpus::get()
        } else {
            self.max_parallel as usize
        }
    }
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            author: Self::default_author(),
            avatar_path: Self::default_avatar_path(),
            output_path: Self::default_output_path(),
            max_parallel: 0,
        }
    }
}

/// 字体资源配置：每种字重对应一个字体文件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontConfig {
    /// 字体目录
    #[serde(default = "FontConfig::default_dir")]
    pub dir: String,
    #[serde(default = "FontConfig::default_regular")]
    pub regular: String,
    #[serde(default = "FontConfig::default_medium")]
    pub medium: String,
    #[serde(default = "FontConfig::default_bold")]
    pub bold: String,
}

impl FontConfig {
    fn default_dir() -> String {
        "resources/fonts".to_string()
    }
    fn default_regular() -> String {
        "Go-Regular.ttf".to_string()
    }
    fn default_medium() -> String {
        "Go-Medium.ttf".to_string()
    }
    fn default_bold() -> String {
        "Go-Bold.ttf".to_string()
    }

    /// 获取指定字重的字体文件完整路径
    pub fn path_for(&self, style: FontStyle) -> PathBuf {
        let file = match style {
            FontStyle::Regular => &self.regular,
            FontStyle::Medium => &self.medium,
            FontStyle::Bold => &self.bold,
        };
        PathBuf::from(&self.dir).join(file)
    }
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            dir: Self::default_dir(),
            regular: Self::default_regular(),
            medium: Self::default_medium(),
            bold: Self::default_bold(),
        }
    }
}

/// 换行宽度估算方式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WrapMeasure {
    /// `字号 × 字符数`（与旧版布局保持一致）
    #[default]
    Coarse,
    /// 按字形真实步进宽度累加（含字距调整）
    Glyph,
}

/// 单个文字块的版式
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextBlockLayout {
    pub x: i32,
    pub y: i32,
    /// 字号（pt，72 DPI 下等于像素）
    pub size: f32,
    pub color: [u8; 4],
    pub font: FontStyle,
}

/// 头像区域版式
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvatarLayout {
    /// 缩放后的正方形边长
    pub side: u32,
    /// 圆形遮罩半径
    pub radius: u32,
    /// 距画布右/下边缘的距离
    pub margin: u32,
}

/// 版式配置：画布尺寸、锚点、字号与头像位置全部集中于此
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayoutConfig {
    pub width: u32,
    pub height: u32,
    pub background: [u8; 4],
    pub topic: TextBlockLayout,
    pub title: TextBlockLayout,
    pub author: TextBlockLayout,
    /// 标题换行宽度（像素）
    pub title_wrap_width: f32,
    /// 行距系数（乘以字号）
    pub line_advance: f32,
    pub wrap_measure: WrapMeasure,
    pub avatar: AvatarLayout,
}

impl LayoutConfig {
    /// 头像左上角在画布中的位置
    pub fn avatar_origin(&self) -> (i64, i64) {
        let x = self.width as i64 - self.avatar.side as i64 - self.avatar.margin as i64;
        let y = self.height as i64 - self.avatar.side as i64 - self.avatar.margin as i64;
        (x, y)
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        const WHITE: [u8; 4] = [255, 255, 255, 255];
        Self {
            width: 1200,
            height: 630,
            background: [23, 23, 23, 255],
            topic: TextBlockLayout {
                x: 80,
                y: 80,
                size: 40.0,
                color: WHITE,
                font: FontStyle::Medium,
            },
            title: TextBlockLayout {
                x: 80,
                y: 240,
                size: 60.0,
                color: WHITE,
                font: FontStyle::Bold,
            },
            author: TextBlockLayout {
                x: 80,
                y: 480,
                size: 40.0,
                color: WHITE,
                font: FontStyle::Regular,
            },
            title_wrap_width: 2000.0,
            line_advance: 1.5,
            wrap_measure: WrapMeasure::Coarse,
            avatar: AvatarLayout {
                side: 160,
                radius: 80,
                margin: 80,
            },
        }
    }
}

/// 优雅退出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// 优雅退出超时时间（秒）
    #[serde(default = "ShutdownConfig::default_timeout")]
    pub timeout_secs: u64,
}

impl ShutdownConfig {
    fn default_timeout() -> u64 {
        30
    }

    /// 获取优雅退出超时时间
    pub fn timeout_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub api: ApiConfig,
    /// CORS 配置
    #[serde(default)]
    pub cors: CorsConfig,
    /// 缩略图资源配置
    #[serde(default)]
    pub thumbnail: ThumbnailConfig,
    /// 字体资源配置
    #[serde(default)]
    pub fonts: FontConfig,
    /// 版式配置
    #[serde(default)]
    pub layout: LayoutConfig,
    /// 优雅退出配置
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl AppConfig {
    /// 从配置文件加载配置，支持环境变量覆盖
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(Self::env_source())
    }

    /// 环境变量覆盖：前缀 `APP_`，层级之间用双下划线分隔，
    /// 例如 `APP_API__PREFIX`、`APP_THUMBNAIL__AVATAR_PATH`、`APP_LAYOUT__WRAP_MEASURE`
    fn env_source() -> Environment {
        Environment::with_prefix("APP")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn load_with_env(env: Environment) -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path();

        tracing::info!("正在从 {:?} 加载配置文件", config_path);

        let builder = ConfigBuilder::builder()
            // 配置文件可缺省，缺省时全部使用默认值
            .add_source(File::from(config_path.as_path()).required(false))
            .add_source(env)
            .build()?;

        let config: Self = builder.try_deserialize()?;

        tracing::debug!(
            "配置加载完成: avatar = {}, output = {}, fonts = {}",
            config.thumbnail.avatar_path,
            config.thumbnail.output_path,
            config.fonts.dir
        );

        Ok(config)
    }

    /// 获取全局配置单例
    pub fn global() -> &'static AppConfig {
        CONFIG.get().expect("配置未初始化，请先调用 init_global()")
    }

    /// 初始化全局配置
    pub fn init_global() -> Result<(), ConfigError> {
        let config = Self::load()?;
        CONFIG
            .set(config)
            .map_err(|_| ConfigError::Message("配置已经被初始化".to_string()))?;
        Ok(())
    }

    /// 获取配置文件路径
    fn get_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    /// 获取服务器监听地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 头像源文件路径
    pub fn avatar_path(&self) -> PathBuf {
        PathBuf::from(&self.thumbnail.avatar_path)
    }

    /// 持久化产物路径
    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(&self.thumbnail.output_path)
    }
}
