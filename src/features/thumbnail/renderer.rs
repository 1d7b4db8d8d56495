use std::time::Instant;

use image::{Rgba, RgbaImage, imageops};
use rusttype::{Scale, point};

use super::avatar;
use super::fonts::{FontHandle, FontRegistry};
use super::layout::{self, CoarseMeasure, GlyphMeasure, TextMeasure};
use super::types::{BlockKind, TextBlock, ThumbnailSpec};
use crate::config::{LayoutConfig, TextBlockLayout, WrapMeasure};
use crate::error::ThumbnailError;

/// 分配固定尺寸画布并整体填充背景色
pub fn new_canvas(layout: &LayoutConfig) -> Result<RgbaImage, ThumbnailError> {
    if layout.width == 0 || layout.height == 0 {
        return Err(ThumbnailError::InvalidCanvas(layout.width, layout.height));
    }
    Ok(RgbaImage::from_pixel(
        layout.width,
        layout.height,
        Rgba(layout.background),
    ))
}

fn block(kind: BlockKind, cfg: &TextBlockLayout, wrap_width: Option<f32>) -> TextBlock {
    TextBlock {
        kind,
        font: cfg.font,
        size: cfg.size,
        color: Rgba(cfg.color),
        wrap_width,
        lines: Vec::new(),
    }
}

/// 对三个文字块排版（主题、标题、署名）。
///
/// 字体缺失不影响排版结果，只在绘制阶段跳过；`Glyph` 模式下若标题字体缺失则退回粗略估算。
pub fn layout_blocks(
    spec: &ThumbnailSpec,
    layout: &LayoutConfig,
    fonts: &FontRegistry,
) -> Vec<TextBlock> {
    let mut topic = block(BlockKind::Topic, &layout.topic, None);
    topic.lines = layout::single_line(&spec.topic, topic.size, (layout.topic.x, layout.topic.y));

    let mut title = block(BlockKind::Title, &layout.title, Some(layout.title_wrap_width));
    let coarse = CoarseMeasure { size: title.size };
    let glyph = match (layout.wrap_measure, fonts.get(title.font)) {
        (WrapMeasure::Glyph, Some(font)) => Some(GlyphMeasure::new(font, title.size)),
        _ => None,
    };
    let measure: &dyn TextMeasure = match &glyph {
        Some(g) => g,
        None => &coarse,
    };
    title.lines = layout::wrap(
        &spec.title,
        measure,
        title.size,
        (layout.title.x, layout.title.y),
        layout.title_wrap_width,
        layout.line_advance,
    );

    let mut author = block(BlockKind::Author, &layout.author, None);
    author.lines =
        layout::single_line(&spec.author, author.size, (layout.author.x, layout.author.y));

    vec![topic, title, author]
}

/// 非预乘 RGBA 的 over 混合；`coverage` 为字形覆盖率
fn blend_over(dst: &mut Rgba<u8>, color: Rgba<u8>, coverage: f32) {
    let sa = coverage.clamp(0.0, 1.0) * (color.0[3] as f32 / 255.0);
    if sa <= 0.0 {
        return;
    }
    let da = dst.0[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        *dst = Rgba([0, 0, 0, 0]);
        return;
    }
    for i in 0..3 {
        let s = color.0[i] as f32;
        let d = dst.0[i] as f32;
        let v = (s * sa + d * da * (1.0 - sa)) / out_a;
        dst.0[i] = v.round().clamp(0.0, 255.0) as u8;
    }
    dst.0[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

fn draw_line(
    canvas: &mut RgbaImage,
    font: &FontHandle,
    size: f32,
    color: Rgba<u8>,
    x: i32,
    baseline_y: i32,
    text: &str,
) {
    let scale = Scale::uniform(size);
    let (w, h) = (canvas.width() as i32, canvas.height() as i32);
    for glyph in font.layout(text, scale, point(x as f32, baseline_y as f32)) {
        let Some(bb) = glyph.pixel_bounding_box() else {
            continue;
        };
        glyph.draw(|gx, gy, v| {
            let px = gx as i32 + bb.min.x;
            let py = gy as i32 + bb.min.y;
            if px < 0 || py < 0 || px >= w || py >= h {
                return;
            }
            blend_over(canvas.get_pixel_mut(px as u32, py as u32), color, v);
        });
    }
}

/// 绘制一个文字块；对应字重缺失时整块跳过。返回实际绘制的行数
pub fn draw_block(canvas: &mut RgbaImage, block: &TextBlock, fonts: &FontRegistry) -> usize {
    if block.lines.is_empty() {
        return 0;
    }
    let Some(font) = fonts.get(block.font) else {
        tracing::debug!(
            "跳过文字块 {}: 字重 {} 未加载",
            block.kind.as_str(),
            block.font.as_str()
        );
        return 0;
    };
    for line in &block.lines {
        draw_line(
            canvas,
            font,
            block.size,
            block.color,
            line.x,
            line.baseline_y,
            &line.text,
        );
    }
    block.lines.len()
}

/// 将已遮罩的头像以 over 混合贴到右下角
pub fn composite_avatar(canvas: &mut RgbaImage, avatar: &RgbaImage, layout: &LayoutConfig) {
    let (ox, oy) = layout.avatar_origin();
    imageops::overlay(canvas, avatar, ox, oy);
}

/// 合成完整缩略图。
///
/// 头像先于文字准备：头像不可用时直接失败，不产出任何图像；
/// 绘制顺序仍为 背景 → 主题 → 标题 → 署名 → 头像。
pub fn render_thumbnail(
    spec: &ThumbnailSpec,
    layout: &LayoutConfig,
    fonts: &FontRegistry,
    avatar_source: &[u8],
) -> Result<RgbaImage, ThumbnailError> {
    let t0 = Instant::now();

    let avatar = avatar::prepare_avatar(avatar_source, layout.avatar.side, layout.avatar.radius)?;
    let t_avatar = t0.elapsed();

    let mut canvas = new_canvas(layout)?;
    let blocks = layout_blocks(spec, layout, fonts);
    let mut drawn = 0;
    for block in &blocks {
        drawn += draw_block(&mut canvas, block, fonts);
    }
    let t_text = t0.elapsed();

    composite_avatar(&mut canvas, &avatar, layout);
    let t_total = t0.elapsed();

    tracing::info!(
        "缩略图合成分段: 头像={:?}, 文字={:?}({}行), 贴图={:?}, 总计={:?}",
        t_avatar,
        t_text - t_avatar,
        drawn,
        t_total - t_text,
        t_total
    );

    Ok(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::thumbnail::fonts::{FontStyle, system_font};
    use image::{DynamicImage, ImageFormat};
    use std::io::Cursor;

    const BG: Rgba<u8> = Rgba([23, 23, 23, 255]);
    const AVATAR_COLOR: Rgba<u8> = Rgba([10, 200, 120, 255]);

    fn spec(topic: &str, title: &str) -> ThumbnailSpec {
        ThumbnailSpec {
            topic: topic.to_string(),
            title: title.to_string(),
            author: "piklr".to_string(),
        }
    }

    fn avatar_png() -> Vec<u8> {
        let img = RgbaImage::from_pixel(300, 300, AVATAR_COLOR);
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .expect("encode avatar");
        out.into_inner()
    }

    fn registry_with_system_font() -> FontRegistry {
        let font = system_font();
        FontStyle::ALL
            .into_iter()
            .fold(FontRegistry::empty(), |r, s| r.with_font(s, font.clone()))
    }

    #[test]
    fn canvas_is_filled_with_background() {
        let canvas = new_canvas(&LayoutConfig::default()).expect("canvas");
        assert_eq!(canvas.dimensions(), (1200, 630));
        assert!(canvas.pixels().all(|p| *p == BG));
    }

    #[test]
    fn zero_sized_canvas_is_rejected() {
        let layout = LayoutConfig {
            width: 0,
            ..LayoutConfig::default()
        };
        assert!(matches!(
            new_canvas(&layout),
            Err(ThumbnailError::InvalidCanvas(0, 630))
        ));
    }

    #[test]
    fn blocks_use_fixed_anchors() {
        let blocks = layout_blocks(
            &spec("News", "A Short Headline"),
            &LayoutConfig::default(),
            &FontRegistry::empty(),
        );
        let anchors: Vec<_> = blocks
            .iter()
            .map(|b| (b.kind, b.lines[0].x, b.lines[0].y))
            .collect();
        assert_eq!(
            anchors,
            vec![
                (BlockKind::Topic, 80, 80),
                (BlockKind::Title, 80, 240),
                (BlockKind::Author, 80, 480),
            ]
        );
        assert_eq!(blocks[1].wrap_width, Some(2000.0));
        assert_eq!(blocks[2].lines[0].text, "piklr");
    }

    #[test]
    fn empty_title_produces_no_title_lines() {
        let blocks = layout_blocks(&spec("News", ""), &LayoutConfig::default(), &FontRegistry::empty());
        assert!(blocks[1].lines.is_empty());
        let mut canvas = new_canvas(&LayoutConfig::default()).expect("canvas");
        assert_eq!(draw_block(&mut canvas, &blocks[1], &FontRegistry::empty()), 0);
    }

    #[test]
    fn glyph_mode_without_font_falls_back_to_coarse() {
        let layout = LayoutConfig {
            wrap_measure: WrapMeasure::Glyph,
            ..LayoutConfig::default()
        };
        let title = "abcd ".repeat(60);
        let glyph = layout_blocks(&spec("", &title), &layout, &FontRegistry::empty());
        let coarse = layout_blocks(&spec("", &title), &LayoutConfig::default(), &FontRegistry::empty());
        assert_eq!(glyph[1].lines, coarse[1].lines);
    }

    #[test]
    fn missing_fonts_still_render_background_and_avatar() {
        let layout = LayoutConfig::default();
        let canvas = render_thumbnail(
            &spec("News", "A Short Headline"),
            &layout,
            &FontRegistry::empty(),
            &avatar_png(),
        )
        .expect("render");

        assert_eq!(canvas.dimensions(), (1200, 630));
        assert_eq!(*canvas.get_pixel(0, 0), BG);
        // 文字区域保持背景色
        assert_eq!(*canvas.get_pixel(100, 100), BG);
        // 头像中心为头像色，头像方框角落被遮罩掉
        assert_eq!(*canvas.get_pixel(960 + 80, 390 + 80), AVATAR_COLOR);
        assert_eq!(*canvas.get_pixel(960, 390), BG);
        assert_eq!(*canvas.get_pixel(960 + 159, 390 + 159), BG);
    }

    #[test]
    fn composite_avatar_places_opaque_pixels_and_skips_transparent_ones() {
        let mut layout = LayoutConfig::default();
        let mut canvas = new_canvas(&layout).expect("canvas");
        let mut avatar = RgbaImage::from_pixel(160, 160, AVATAR_COLOR);
        avatar.put_pixel(0, 0, Rgba([0, 0, 0, 0]));

        composite_avatar(&mut canvas, &avatar, &layout);
        assert_eq!(*canvas.get_pixel(960, 390), BG);
        assert_eq!(*canvas.get_pixel(961, 390), AVATAR_COLOR);
        assert_eq!(*canvas.get_pixel(1119, 549), AVATAR_COLOR);
        assert_eq!(*canvas.get_pixel(1120, 550), BG);

        // 头像超出画布右下角时越界部分被裁掉
        layout.avatar.margin = 0;
        layout.width = 1000;
        layout.height = 500;
        let mut small = new_canvas(&layout).expect("canvas");
        composite_avatar(&mut small, &RgbaImage::from_pixel(200, 200, AVATAR_COLOR), &layout);
        assert_eq!(*small.get_pixel(999, 499), AVATAR_COLOR);
    }

    #[test]
    fn avatar_failure_aborts_render() {
        let err = render_thumbnail(
            &spec("News", "Title"),
            &LayoutConfig::default(),
            &FontRegistry::empty(),
            b"not an image",
        )
        .err()
        .expect("render must fail");
        assert!(matches!(err, ThumbnailError::AvatarDecode(_)));
    }

    #[test]
    #[ignore = "需要系统字体，显式运行"]
    fn text_is_drawn_when_fonts_are_available() {
        let fonts = registry_with_system_font();
        let layout = LayoutConfig::default();
        let canvas = render_thumbnail(&spec("News", "Headline"), &layout, &fonts, &avatar_png())
            .expect("render");

        let changed_in = |x0: u32, y0: u32, x1: u32, y1: u32| {
            (y0..y1).any(|y| (x0..x1).any(|x| *canvas.get_pixel(x, y) != BG))
        };
        assert!(changed_in(80, 80, 400, 130), "topic not drawn");
        assert!(changed_in(80, 240, 700, 310), "title not drawn");
        assert!(changed_in(80, 480, 400, 530), "author not drawn");
        assert_eq!(*canvas.get_pixel(0, 0), BG);
    }

    #[test]
    fn blend_over_respects_coverage() {
        let mut px = BG;
        blend_over(&mut px, Rgba([255, 255, 255, 255]), 0.0);
        assert_eq!(px, BG);
        blend_over(&mut px, Rgba([255, 255, 255, 255]), 1.0);
        assert_eq!(px, Rgba([255, 255, 255, 255]));

        let mut half = Rgba([0, 0, 0, 255]);
        blend_over(&mut half, Rgba([255, 255, 255, 255]), 0.5);
        assert_eq!(half, Rgba([128, 128, 128, 255]));
    }
}
