use rusttype::Scale;

use super::fonts::FontHandle;

/// 文本宽度估算
pub trait TextMeasure {
    fn measure(&self, text: &str) -> f32;
}

/// 粗略估算：`字号 × 字符数`
#[derive(Debug, Clone, Copy)]
pub struct CoarseMeasure {
    pub size: f32,
}

impl TextMeasure for CoarseMeasure {
    fn measure(&self, text: &str) -> f32 {
        self.size * text.chars().count() as f32
    }
}

/// 按字形步进宽度累加（含字距调整）
pub struct GlyphMeasure<'a> {
    font: &'a FontHandle,
    scale: Scale,
}

impl<'a> GlyphMeasure<'a> {
    pub fn new(font: &'a FontHandle, size: f32) -> Self {
        Self {
            font,
            scale: Scale::uniform(size),
        }
    }
}

impl TextMeasure for GlyphMeasure<'_> {
    fn measure(&self, text: &str) -> f32 {
        let mut width = 0.0;
        let mut prev = None;
        for ch in text.chars() {
            let glyph = self.font.glyph(ch).scaled(self.scale);
            let id = glyph.id();
            if let Some(prev) = prev {
                width += self.font.pair_kerning(self.scale, prev, id);
            }
            width += glyph.h_metrics().advance_width;
            prev = Some(id);
        }
        width
    }
}

/// 排版后的一行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaidOutLine {
    pub text: String,
    /// 行左上角 x
    pub x: i32,
    /// 行顶部 y（光标位置）
    pub y: i32,
    /// 基线 y（72 DPI 下为 `y + 字号`）
    pub baseline_y: i32,
}

impl LaidOutLine {
    fn new(text: String, x: i32, y: i32, size: f32) -> Self {
        Self {
            text,
            x,
            y,
            baseline_y: y + size as i32,
        }
    }
}

/// 单行文字块：不换行，空白字符串不产生任何行
pub fn single_line(text: &str, size: f32, anchor: (i32, i32)) -> Vec<LaidOutLine> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    vec![LaidOutLine::new(text.to_string(), anchor.0, anchor.1, size)]
}

/// 贪心换行。
///
/// 按空白切词，逐词估算“当前行 + 新词”的宽度；超出 `max_width` 时先输出当前行，
/// 光标下移 `line_advance × 字号`，新词作为下一行的开头。单个超宽词独占一行，不拆分。
pub fn wrap(
    text: &str,
    measure: &dyn TextMeasure,
    size: f32,
    anchor: (i32, i32),
    max_width: f32,
    line_advance: f32,
) -> Vec<LaidOutLine> {
    let (x, mut y) = anchor;
    let step = (size * line_advance) as i32;
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        let candidate_width = measure.measure(&format!("{line}{word}"));
        if candidate_width > max_width && !line.is_empty() {
            lines.push(LaidOutLine::new(line.trim_end().to_string(), x, y, size));
            y += step;
            line.clear();
        }
        line.push_str(word);
        line.push(' ');
    }

    let rest = line.trim_end();
    if !rest.is_empty() {
        lines.push(LaidOutLine::new(rest.to_string(), x, y, size));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::thumbnail::fonts::system_font;

    const ANCHOR: (i32, i32) = (80, 240);

    fn coarse_wrap(text: &str, size: f32, max_width: f32) -> Vec<LaidOutLine> {
        wrap(text, &CoarseMeasure { size }, size, ANCHOR, max_width, 1.5)
    }

    #[test]
    fn single_line_ignores_length() {
        let long = "topic ".repeat(500);
        let lines = single_line(&long, 40.0, (80, 80));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].y, 80);
        assert_eq!(lines[0].baseline_y, 120);
        assert_eq!(lines[0].text, long);
    }

    #[test]
    fn empty_text_yields_no_lines() {
        assert!(single_line("", 40.0, (80, 80)).is_empty());
        assert!(coarse_wrap("", 60.0, 2000.0).is_empty());
        assert!(coarse_wrap("   \t  ", 60.0, 2000.0).is_empty());
    }

    #[test]
    fn short_title_fits_on_one_line() {
        let lines = coarse_wrap("A Short Headline", 60.0, 2000.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "A Short Headline");
        assert_eq!((lines[0].x, lines[0].y), ANCHOR);
    }

    #[test]
    fn wrapped_lines_advance_by_one_and_a_half_size() {
        let title = "abcd ".repeat(60);
        let lines = coarse_wrap(title.trim_end(), 60.0, 2000.0);
        assert!(lines.len() > 1);
        for (i, line) in lines.iter().enumerate() {
            assert_eq!(line.y, ANCHOR.1 + 90 * i as i32);
            assert_eq!(line.x, ANCHOR.0);
            assert!(60.0 * line.text.chars().count() as f32 <= 2000.0);
        }
        // 6 个 4 字符单词 = 29 字符；第 7 个会到 34 字符 × 60 > 2000
        assert_eq!(lines[0].text.split(' ').count(), 6);
    }

    #[test]
    fn wrapping_is_deterministic() {
        let title = "the quick brown fox jumps over the lazy dog ".repeat(8);
        let a = coarse_wrap(&title, 60.0, 700.0);
        let b = coarse_wrap(&title, 60.0, 700.0);
        assert_eq!(a, b);
    }

    #[test]
    fn line_count_grows_as_width_shrinks() {
        let title = "lorem ipsum dolor sit amet consectetur adipiscing elit sed do";
        let mut last = 0;
        for width in (700..=4000).rev().step_by(100) {
            let count = coarse_wrap(title, 60.0, width as f32).len();
            assert!(count >= last, "width {width}: {count} < {last}");
            last = count;
        }
        assert!(last > 1);
    }

    #[test]
    fn oversized_word_gets_its_own_line() {
        let lines = coarse_wrap("hi supercalifragilistic ok", 60.0, 300.0);
        let texts: Vec<_> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["hi", "supercalifragilistic", "ok"]);
    }

    #[test]
    #[ignore = "需要系统字体，显式运行"]
    fn glyph_measure_keeps_lines_within_width() {
        let font = system_font();
        let measure = GlyphMeasure::new(&font, 60.0);
        assert!(measure.measure("iiii") < measure.measure("WWWW"));
        let title = "Rust makes systems programming approachable and fearless ".repeat(4);
        let lines = wrap(&title, &measure, 60.0, ANCHOR, 1040.0, 1.5);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(measure.measure(&line.text) <= 1040.0, "{:?}", line.text);
        }
    }
}
