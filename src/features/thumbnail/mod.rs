mod avatar;
pub mod fonts;
pub mod handler;
pub mod layout;
pub mod mask;
mod renderer;
mod service;
pub mod sink;
mod types;

/// 启动期预热全局字体表（读取并解析三种字重）。
///
/// 只用于把字体解析开销挪到启动阶段，不参与请求处理路径。
pub(crate) fn prewarm_fonts() {
    let registry = fonts::get_global_font_registry();
    let loaded: Vec<_> = registry.loaded_styles().iter().map(|s| s.as_str()).collect();
    tracing::info!("字体预热完成: 已加载 {:?}", loaded);
}

pub use avatar::{apply_mask, decode_avatar, prepare_avatar};
pub use fonts::{FontHandle, FontRegistry, FontStyle, get_global_font_registry, load_font};
pub use handler::create_thumbnail_router;
pub use layout::{CoarseMeasure, GlyphMeasure, LaidOutLine, TextMeasure};
pub use mask::CircularMask;
pub use renderer::{composite_avatar, draw_block, layout_blocks, new_canvas, render_thumbnail};
pub use service::ThumbnailService;
pub use sink::{EmitReport, FileSink, ResponseSink, ThumbnailSink, emit, encode_png};
pub use types::{BlockKind, TextBlock, ThumbnailQuery, ThumbnailSpec};
