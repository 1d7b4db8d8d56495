use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};

use super::mask::CircularMask;
use crate::error::ThumbnailError;

/// 解码头像源字节（格式自动识别，至少支持 JPEG/PNG）
pub fn decode_avatar(bytes: &[u8]) -> Result<DynamicImage, ThumbnailError> {
    let img = image::load_from_memory(bytes)?;
    if img.width() == 0 || img.height() == 0 {
        return Err(ThumbnailError::AvatarDecode("头像尺寸为 0".to_string()));
    }
    Ok(img)
}

/// 以遮罩为 alpha 裁剪：遮罩不透明处保留源像素，其余完全透明
pub fn apply_mask(src: &RgbaImage, mask: &CircularMask) -> RgbaImage {
    RgbaImage::from_fn(src.width(), src.height(), |x, y| {
        if mask.alpha_at(x as i32, y as i32) == 255 {
            *src.get_pixel(x, y)
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

/// 头像预处理：解码 → 最近邻缩放到 `side × side` → 居中圆形遮罩
pub fn prepare_avatar(bytes: &[u8], side: u32, radius: u32) -> Result<RgbaImage, ThumbnailError> {
    let decoded = decode_avatar(bytes)?;
    let resized = imageops::resize(&decoded.to_rgba8(), side, side, FilterType::Nearest);
    let half = (side / 2) as i32;
    let mask = CircularMask::new((half, half), radius);
    Ok(apply_mask(&resized, &mask))
}
