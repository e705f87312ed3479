//! 纯几何变换：缩放、裁剪、旋转/翻转。
//!
//! 只操作 `DynamicImage`，不涉及 HTTP 与编码，便于单元测试。

use image::DynamicImage;
use image::imageops::FilterType;

use crate::error::AppError;

/// 允许的最大边长（像素）
pub const MAX_DIMENSION: u32 = 10_000;

/// 缩放适配模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fit {
    /// 等比缩放，结果落在目标框内（默认）
    #[default]
    Contain,
    /// 等比缩放铺满目标框，溢出部分居中裁掉
    Cover,
    /// 精确拉伸到目标尺寸，允许变形
    Fill,
}

impl Fit {
    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "contain" => Ok(Self::Contain),
            "cover" => Ok(Self::Cover),
            "fill" => Ok(Self::Fill),
            other => Err(AppError::Validation(format!(
                "fit 取值非法: {other}（支持 contain/cover/fill）"
            ))),
        }
    }
}

/// 旋转角度（仅支持直角旋转，任意角度会引入画布扩展与插值问题）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s.trim() {
            "90" => Ok(Self::Deg90),
            "180" => Ok(Self::Deg180),
            "270" => Ok(Self::Deg270),
            other => Err(AppError::Validation(format!(
                "angle 取值非法: {other}（支持 90/180/270）"
            ))),
        }
    }
}

/// 翻转方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipMode {
    Horizontal,
    Vertical,
}

impl FlipMode {
    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "horizontal" | "h" => Ok(Self::Horizontal),
            "vertical" | "v" => Ok(Self::Vertical),
            other => Err(AppError::Validation(format!(
                "flip 取值非法: {other}（支持 horizontal/vertical）"
            ))),
        }
    }
}

fn check_dimension(name: &str, v: u32) -> Result<(), AppError> {
    if v == 0 || v > MAX_DIMENSION {
        return Err(AppError::Validation(format!(
            "{name} 必须在 1-{MAX_DIMENSION} 之间: {v}"
        )));
    }
    Ok(())
}

/// 缩放。width/height 至少给一个；只给一边时按比例推导另一边。
/// cover/fill 需要同时给出宽高。
pub fn resize(
    img: &DynamicImage,
    width: Option<u32>,
    height: Option<u32>,
    fit: Fit,
) -> Result<DynamicImage, AppError> {
    if let Some(w) = width {
        check_dimension("width", w)?;
    }
    if let Some(h) = height {
        check_dimension("height", h)?;
    }

    let (src_w, src_h) = (img.width(), img.height());
    let (w, h) = match (width, height) {
        (None, None) => {
            return Err(AppError::MissingField("width 或 height".to_string()));
        }
        (Some(w), None) => {
            // 按比例推导的一边同样受边长上限约束（细长图可能放大出天文尺寸）
            let h = ((w as u64 * src_h as u64) / src_w as u64).max(1) as u32;
            check_dimension("height", h)?;
            (w, h)
        }
        (None, Some(h)) => {
            let w = ((h as u64 * src_w as u64) / src_h as u64).max(1) as u32;
            check_dimension("width", w)?;
            (w, h)
        }
        (Some(w), Some(h)) => (w, h),
    };

    if matches!(fit, Fit::Cover | Fit::Fill) && (width.is_none() || height.is_none()) {
        return Err(AppError::Validation(
            "fit=cover/fill 需要同时提供 width 和 height".to_string(),
        ));
    }

    let out = match fit {
        Fit::Contain => img.resize(w, h, FilterType::Lanczos3),
        Fit::Cover => img.resize_to_fill(w, h, FilterType::Lanczos3),
        Fit::Fill => img.resize_exact(w, h, FilterType::Lanczos3),
    };
    Ok(out)
}

/// 裁剪。矩形必须完全落在原图范围内。
pub fn crop(
    img: &DynamicImage,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
) -> Result<DynamicImage, AppError> {
    check_dimension("width", width)?;
    check_dimension("height", height)?;

    let (src_w, src_h) = (img.width(), img.height());
    let within = (x as u64 + width as u64) <= src_w as u64
        && (y as u64 + height as u64) <= src_h as u64;
    if !within {
        return Err(AppError::Validation(format!(
            "裁剪区域超出原图范围: 原图 {src_w}x{src_h}, 请求 x={x} y={y} w={width} h={height}"
        )));
    }
    Ok(img.crop_imm(x, y, width, height))
}

/// 旋转与翻转。先旋转后翻转；二者至少提供一个（由 handler 校验）。
pub fn rotate_flip(
    img: &DynamicImage,
    angle: Option<Rotation>,
    flip: Option<FlipMode>,
) -> DynamicImage {
    let mut out = match angle {
        Some(Rotation::Deg90) => img.rotate90(),
        Some(Rotation::Deg180) => img.rotate180(),
        Some(Rotation::Deg270) => img.rotate270(),
        None => img.clone(),
    };
    out = match flip {
        Some(FlipMode::Horizontal) => out.fliph(),
        Some(FlipMode::Vertical) => out.flipv(),
        None => out,
    };
    out
}
