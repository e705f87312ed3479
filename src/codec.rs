//! 图片解码/编码统一入口。
//!
//! 所有端点共用：输入一律以字节嗅探格式（不信任客户端 Content-Type），
//! 输出收敛到 png/jpeg/webp 三种编码。

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageFormat};

use crate::error::AppError;

/// 支持的输出编码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeFormat {
    Png,
    Jpeg,
    WebP,
}

impl EncodeFormat {
    /// 解析用户传入的格式名（大小写不敏感，jpg 与 jpeg 等价）
    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "webp" => Ok(Self::WebP),
            other => Err(AppError::Validation(format!(
                "format 取值非法: {other}（支持 png/jpeg/webp）"
            ))),
        }
    }

    /// 由输入格式推导默认输出格式：gif/bmp/tiff 等无损源统一落到 png。
    pub fn from_input(fmt: ImageFormat) -> Self {
        match fmt {
            ImageFormat::Jpeg => Self::Jpeg,
            ImageFormat::WebP => Self::WebP,
            _ => Self::Png,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::WebP => "webp",
        }
    }

    /// 下载文件名使用的扩展名
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }
}

/// 接受的输入格式白名单。动图（gif）只取首帧，这与 image crate 的默认行为一致。
const SUPPORTED_INPUT: [ImageFormat; 6] = [
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::WebP,
    ImageFormat::Gif,
    ImageFormat::Bmp,
    ImageFormat::Tiff,
];

/// 嗅探上传字节的图片格式，不在白名单内的一律拒绝。
pub fn sniff_format(bytes: &[u8]) -> Result<ImageFormat, AppError> {
    let fmt = image::guess_format(bytes)
        .map_err(|_| AppError::UnsupportedMedia("无法识别的图片内容".to_string()))?;
    if SUPPORTED_INPUT.contains(&fmt) {
        Ok(fmt)
    } else {
        Err(AppError::UnsupportedMedia(format!(
            "不支持的输入格式: {fmt:?}"
        )))
    }
}

/// 解码上传字节，返回像素与嗅探到的输入格式。
pub fn decode(bytes: &[u8]) -> Result<(DynamicImage, ImageFormat), AppError> {
    let fmt = sniff_format(bytes)?;
    let img = image::load_from_memory_with_format(bytes, fmt)
        .map_err(|e| AppError::ImageProcess(format!("解码失败: {e}")))?;
    Ok((img, fmt))
}

/// 按目标格式编码。quality 仅对有损编码生效（jpeg/webp，1-100）。
///
/// WebP：quality=100 走无损编码，其余走有损（libwebp 语义）。
pub fn encode(img: &DynamicImage, fmt: EncodeFormat, quality: u8) -> Result<Vec<u8>, AppError> {
    let quality = quality.clamp(1, 100);
    match fmt {
        EncodeFormat::Png => {
            let mut out = Cursor::new(Vec::new());
            img.write_to(&mut out, ImageFormat::Png)
                .map_err(|e| AppError::ImageProcess(format!("PNG 编码失败: {e}")))?;
            Ok(out.into_inner())
        }
        EncodeFormat::Jpeg => {
            // JPEG 无透明通道，先扁平化为 RGB
            let rgb = img.to_rgb8();
            let mut out = Vec::new();
            let mut enc = JpegEncoder::new_with_quality(&mut out, quality);
            enc.encode(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| AppError::ImageProcess(format!("JPEG 编码失败: {e}")))?;
            Ok(out)
        }
        EncodeFormat::WebP => {
            let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
            let enc = webp::Encoder::from_image(&rgba)
                .map_err(|e| AppError::ImageProcess(format!("WebP 编码器创建失败: {e}")))?;
            let mem = if quality >= 100 {
                enc.encode_lossless()
            } else {
                enc.encode(quality as f32)
            };
            Ok(mem.to_vec())
        }
    }
}
