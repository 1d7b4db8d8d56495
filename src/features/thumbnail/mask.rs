use image::{GrayImage, Luma};

/// 程序生成的圆形 alpha 遮罩（硬边，无抗锯齿）。
///
/// 栅格边长为 `2 × radius`，左上角位于 `center - radius`；
/// 像素按中心点 `(x + 0.5, y + 0.5)` 采样，与圆心距离平方严格小于 `radius²` 时不透明。
#[derive(Debug, Clone)]
pub struct CircularMask {
    center: (i32, i32),
    radius: u32,
    alpha: GrayImage,
}

impl CircularMask {
    pub fn new(center: (i32, i32), radius: u32) -> Self {
        let side = radius * 2;
        let origin = (center.0 - radius as i32, center.1 - radius as i32);
        let alpha = GrayImage::from_fn(side, side, |x, y| {
            let inside = disk_contains(center, radius, origin.0 + x as i32, origin.1 + y as i32);
            Luma([if inside { 255 } else { 0 }])
        });
        Self {
            center,
            radius,
            alpha,
        }
    }

    /// 栅格左上角的绝对坐标
    pub fn origin(&self) -> (i32, i32) {
        (
            self.center.0 - self.radius as i32,
            self.center.1 - self.radius as i32,
        )
    }

    /// 遮罩栅格本身
    pub fn raster(&self) -> &GrayImage {
        &self.alpha
    }

    /// 绝对坐标处的 alpha；栅格之外视为透明
    pub fn alpha_at(&self, x: i32, y: i32) -> u8 {
        let (ox, oy) = self.origin();
        let (lx, ly) = (x - ox, y - oy);
        if lx < 0 || ly < 0 || lx as u32 >= self.alpha.width() || ly as u32 >= self.alpha.height()
        {
            return 0;
        }
        self.alpha.get_pixel(lx as u32, ly as u32).0[0]
    }
}

fn disk_contains(center: (i32, i32), radius: u32, x: i32, y: i32) -> bool {
    let dx = (x - center.0) as f64 + 0.5;
    let dy = (y - center.1) as f64 + 0.5;
    let r = radius as f64;
    dx * dx + dy * dy < r * r
}
