//! 色键抠图：按与键色的欧氏距离将背景置为透明，
//! 在 tolerance 与 2×tolerance 之间做线性软边过渡。

use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};

use crate::error::AppError;

/// 解析 `#RRGGBB`（井号可省略）。
pub fn parse_hex_color(s: &str) -> Result<[u8; 3], AppError> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(AppError::Validation(format!(
            "color 必须是 #RRGGBB 形式: {s}"
        )));
    }
    let mut rgb = [0u8; 3];
    for (i, chunk) in rgb.iter_mut().enumerate() {
        // len 校验过，切片与 hex 解析都不会失败
        *chunk = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).unwrap_or(0);
    }
    Ok(rgb)
}

/// 未显式给键色时，取四角像素的均值作为背景色估计。
pub fn estimate_key_color(img: &DynamicImage) -> [u8; 3] {
    let (w, h) = img.dimensions();
    let corners = [
        img.get_pixel(0, 0),
        img.get_pixel(w.saturating_sub(1), 0),
        img.get_pixel(0, h.saturating_sub(1)),
        img.get_pixel(w.saturating_sub(1), h.saturating_sub(1)),
    ];
    let mut sum = [0u32; 3];
    for px in &corners {
        for (acc, ch) in sum.iter_mut().zip(px.0.iter()) {
            *acc += u32::from(*ch);
        }
    }
    [
        (sum[0] / 4) as u8,
        (sum[1] / 4) as u8,
        (sum[2] / 4) as u8,
    ]
}

fn color_distance(a: [u8; 3], b: [u8; 3]) -> f32 {
    let dr = f32::from(a[0]) - f32::from(b[0]);
    let dg = f32::from(a[1]) - f32::from(b[1]);
    let db = f32::from(a[2]) - f32::from(b[2]);
    (dr * dr + dg * dg + db * db).sqrt()
}

/// 去除与键色相近的背景。tolerance 以内完全透明，
/// tolerance 到 2×tolerance 之间按距离线性恢复不透明度。
pub fn remove_background(
    img: &DynamicImage,
    key: [u8; 3],
    tolerance: u8,
) -> DynamicImage {
    let hard = f32::from(tolerance);
    let soft = hard * 2.0;
    let mut out: RgbaImage = img.to_rgba8();

    for px in out.pixels_mut() {
        let rgb = [px.0[0], px.0[1], px.0[2]];
        let dist = color_distance(rgb, key);
        if dist <= hard {
            *px = Rgba([rgb[0], rgb[1], rgb[2], 0]);
        } else if dist < soft && soft > hard {
            let factor = (dist - hard) / (soft - hard);
            let alpha = (f32::from(px.0[3]) * factor).round() as u8;
            px.0[3] = alpha;
        }
    }
    DynamicImage::ImageRgba8(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn hex_color_parses_with_and_without_hash() {
        assert_eq!(parse_hex_color("#00FF7f").unwrap(), [0, 255, 127]);
        assert_eq!(parse_hex_color("ffffff").unwrap(), [255, 255, 255]);
        assert!(parse_hex_color("#12345").is_err());
        assert!(parse_hex_color("zzzzzz").is_err());
    }

    #[test]
    fn corner_estimate_averages_four_corners() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        img.put_pixel(0, 0, Rgba([40, 0, 0, 255]));
        img.put_pixel(3, 0, Rgba([40, 0, 0, 255]));
        img.put_pixel(0, 3, Rgba([40, 0, 0, 255]));
        img.put_pixel(3, 3, Rgba([40, 0, 0, 255]));
        let key = estimate_key_color(&DynamicImage::ImageRgba8(img));
        assert_eq!(key, [40, 0, 0]);
    }

    #[test]
    fn key_colored_pixels_become_transparent() {
        let mut img = RgbaImage::from_pixel(2, 1, Rgba([0, 255, 0, 255]));
        img.put_pixel(1, 0, Rgba([255, 0, 0, 255]));
        let out = remove_background(&DynamicImage::ImageRgba8(img), [0, 255, 0], 30).to_rgba8();
        assert_eq!(out.get_pixel(0, 0).0[3], 0);
        assert_eq!(out.get_pixel(1, 0).0[3], 255);
    }

    #[test]
    fn soft_edge_pixels_get_partial_alpha() {
        // 距键色约 45，落在 30..60 的软边区间
        let img = RgbaImage::from_pixel(1, 1, Rgba([45, 255, 0, 255]));
        let out = remove_background(&DynamicImage::ImageRgba8(img), [0, 255, 0], 30).to_rgba8();
        let alpha = out.get_pixel(0, 0).0[3];
        assert!(alpha > 0 && alpha < 255, "soft alpha: {alpha}");
    }

    #[test]
    fn zero_tolerance_only_removes_exact_matches() {
        let mut img = RgbaImage::from_pixel(2, 1, Rgba([0, 255, 0, 255]));
        img.put_pixel(1, 0, Rgba([1, 255, 0, 255]));
        let out = remove_background(&DynamicImage::ImageRgba8(img), [0, 255, 0], 0).to_rgba8();
        assert_eq!(out.get_pixel(0, 0).0[3], 0);
        assert_eq!(out.get_pixel(1, 0).0[3], 255);
    }
}
