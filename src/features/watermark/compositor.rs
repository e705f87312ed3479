//! 水印合成：锚点定位、等比缩放上限、透明度衰减后 overlay。

use image::{DynamicImage, GenericImageView, RgbaImage, imageops};

use crate::error::AppError;

/// 水印锚点（九宫格中常用的五个）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Anchor {
    NorthWest,
    NorthEast,
    Center,
    SouthWest,
    #[default]
    SouthEast,
}

impl Anchor {
    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s.to_ascii_lowercase().as_str() {
            "north-west" | "top-left" => Ok(Self::NorthWest),
            "north-east" | "top-right" => Ok(Self::NorthEast),
            "center" => Ok(Self::Center),
            "south-west" | "bottom-left" => Ok(Self::SouthWest),
            "south-east" | "bottom-right" => Ok(Self::SouthEast),
            other => Err(AppError::Validation(format!(
                "position 仅支持 north-west/north-east/center/south-west/south-east: {other}"
            ))),
        }
    }

    /// 计算水印左上角坐标。margin 超出可用空间时贴边放置。
    fn offset(self, base_w: u32, base_h: u32, mark_w: u32, mark_h: u32, margin: u32) -> (i64, i64) {
        let max_x = base_w.saturating_sub(mark_w) as i64;
        let max_y = base_h.saturating_sub(mark_h) as i64;
        let m = margin as i64;
        let (x, y) = match self {
            Self::NorthWest => (m, m),
            Self::NorthEast => (max_x - m, m),
            Self::Center => (max_x / 2, max_y / 2),
            Self::SouthWest => (m, max_y - m),
            Self::SouthEast => (max_x - m, max_y - m),
        };
        (x.clamp(0, max_x), y.clamp(0, max_y))
    }
}

/// 水印合成参数
#[derive(Debug, Clone, Copy)]
pub struct WatermarkOptions {
    pub anchor: Anchor,
    /// 0.0-1.0，乘到水印自身 alpha 上
    pub opacity: f32,
    /// 距边缘的像素间距
    pub margin: u32,
    /// 水印相对底图短边的最大占比（超过则等比缩小）
    pub scale: f32,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self {
            anchor: Anchor::default(),
            opacity: 0.5,
            margin: 16,
            scale: 0.25,
        }
    }
}

fn attenuate_alpha(mark: &DynamicImage, opacity: f32) -> RgbaImage {
    let mut rgba = mark.to_rgba8();
    if opacity < 1.0 {
        for px in rgba.pixels_mut() {
            px.0[3] = (f32::from(px.0[3]) * opacity).round() as u8;
        }
    }
    rgba
}

/// 将水印叠加到底图上，返回 RGBA 结果。
pub fn apply_watermark(
    base: &DynamicImage,
    mark: &DynamicImage,
    opts: &WatermarkOptions,
) -> Result<DynamicImage, AppError> {
    if !(0.0..=1.0).contains(&opts.opacity) {
        return Err(AppError::Validation(format!(
            "opacity 必须在 0.0-1.0 之间: {}",
            opts.opacity
        )));
    }
    if !(0.01..=1.0).contains(&opts.scale) {
        return Err(AppError::Validation(format!(
            "scale 必须在 0.01-1.0 之间: {}",
            opts.scale
        )));
    }

    let (bw, bh) = base.dimensions();
    let short_side = bw.min(bh);
    let limit = ((f64::from(short_side) * f64::from(opts.scale)).floor() as u32).max(1);

    let (mw, mh) = mark.dimensions();
    let scaled;
    let mark = if mw > limit || mh > limit {
        scaled = mark.resize(limit, limit, imageops::FilterType::Lanczos3);
        &scaled
    } else {
        mark
    };

    let overlay = attenuate_alpha(mark, opts.opacity);
    let (ow, oh) = overlay.dimensions();
    if ow > bw || oh > bh {
        return Err(AppError::Validation(
            "水印尺寸大于底图，无法合成".to_string(),
        ));
    }

    let (x, y) = opts.anchor.offset(bw, bh, ow, oh, opts.margin);
    let mut canvas = base.to_rgba8();
    imageops::overlay(&mut canvas, &overlay, x, y);
    Ok(DynamicImage::ImageRgba8(canvas))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn solid(w: u32, h: u32, rgba: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba(rgba)))
    }

    #[test]
    fn anchor_parse_accepts_aliases() {
        assert_eq!(Anchor::parse("bottom-right").unwrap(), Anchor::SouthEast);
        assert_eq!(Anchor::parse("NORTH-WEST").unwrap(), Anchor::NorthWest);
        assert!(Anchor::parse("middle").is_err());
    }

    #[test]
    fn south_east_offset_respects_margin() {
        let (x, y) = Anchor::SouthEast.offset(200, 100, 40, 20, 10);
        assert_eq!((x, y), (150, 70));
    }

    #[test]
    fn oversized_margin_clamps_into_frame() {
        let (x, y) = Anchor::NorthWest.offset(50, 50, 40, 40, 999);
        assert_eq!((x, y), (10, 10));
    }

    #[test]
    fn full_opacity_mark_replaces_base_pixels() {
        let base = solid(100, 100, [0, 0, 0, 255]);
        let mark = solid(10, 10, [255, 0, 0, 255]);
        let opts = WatermarkOptions {
            anchor: Anchor::NorthWest,
            opacity: 1.0,
            margin: 0,
            scale: 1.0,
        };
        let out = apply_watermark(&base, &mark, &opts).unwrap().to_rgba8();
        assert_eq!(out.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(out.get_pixel(50, 50).0, [0, 0, 0, 255]);
    }

    #[test]
    fn half_opacity_blends_mark_into_base() {
        let base = solid(20, 20, [0, 0, 0, 255]);
        let mark = solid(4, 4, [255, 255, 255, 255]);
        let opts = WatermarkOptions {
            anchor: Anchor::NorthWest,
            opacity: 0.5,
            margin: 0,
            scale: 1.0,
        };
        let out = apply_watermark(&base, &mark, &opts).unwrap().to_rgba8();
        let px = out.get_pixel(0, 0).0;
        // alpha 混合后应明显亮于底图、暗于水印
        assert!(px[0] > 90 && px[0] < 160, "blended channel: {}", px[0]);
    }

    #[test]
    fn large_mark_is_scaled_to_short_side_fraction() {
        let base = solid(400, 200, [10, 10, 10, 255]);
        let mark = solid(500, 500, [255, 0, 0, 255]);
        let opts = WatermarkOptions::default();
        // 短边 200 * 0.25 = 50，缩放后可以合成
        assert!(apply_watermark(&base, &mark, &opts).is_ok());
    }

    #[test]
    fn out_of_range_opacity_is_rejected() {
        let base = solid(10, 10, [0, 0, 0, 255]);
        let mark = solid(2, 2, [0, 0, 0, 255]);
        let opts = WatermarkOptions {
            opacity: 1.5,
            ..WatermarkOptions::default()
        };
        assert!(apply_watermark(&base, &mark, &opts).is_err());
    }
}
