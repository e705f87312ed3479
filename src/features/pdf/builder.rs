//! 把一组 JPEG 编码的图片组装成每图一页的 PDF。
//! 图片以 DCTDecode XObject 原样嵌入，不做二次采样。

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

use crate::error::AppError;

/// PDF 点 / 像素换算（96 dpi 图片按 72 dpi 版面放置）
const PX_TO_PT: f32 = 0.75;

const A4_PORTRAIT: (f32, f32) = (595.28, 841.89);
const LETTER_PORTRAIT: (f32, f32) = (612.0, 792.0);

/// 页面规格
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageSpec {
    /// 页面尺寸跟随图片（加边距）
    #[default]
    Fit,
    A4,
    Letter,
}

impl PageSpec {
    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s.to_ascii_lowercase().as_str() {
            "fit" => Ok(Self::Fit),
            "a4" => Ok(Self::A4),
            "letter" => Ok(Self::Letter),
            other => Err(AppError::Validation(format!(
                "page 仅支持 fit/a4/letter: {other}"
            ))),
        }
    }
}

/// 一页的素材：JPEG 字节与像素尺寸
#[derive(Debug)]
pub struct PageImage {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// 计算页面尺寸与图片放置矩形（PDF 坐标，原点在左下角）。
/// 固定版面下宽图自动转横向，图片等比缩放后居中。
fn layout(spec: PageSpec, img_w: u32, img_h: u32, margin: f32) -> (f32, f32, f32, f32, f32, f32) {
    let iw = img_w as f32 * PX_TO_PT;
    let ih = img_h as f32 * PX_TO_PT;

    match spec {
        PageSpec::Fit => {
            let pw = iw + margin * 2.0;
            let ph = ih + margin * 2.0;
            (pw, ph, iw, ih, margin, margin)
        }
        PageSpec::A4 | PageSpec::Letter => {
            let (mut pw, mut ph) = if spec == PageSpec::A4 {
                A4_PORTRAIT
            } else {
                LETTER_PORTRAIT
            };
            if iw > ih && pw < ph {
                std::mem::swap(&mut pw, &mut ph);
            }
            let avail_w = (pw - margin * 2.0).max(1.0);
            let avail_h = (ph - margin * 2.0).max(1.0);
            let scale = (avail_w / iw).min(avail_h / ih).min(1.0);
            let dw = iw * scale;
            let dh = ih * scale;
            let x = (pw - dw) / 2.0;
            let y = (ph - dh) / 2.0;
            (pw, ph, dw, dh, x, y)
        }
    }
}

/// 组装 PDF 并序列化为字节。
pub fn build_pdf(images: Vec<PageImage>, spec: PageSpec, margin: f32) -> Result<Vec<u8>, AppError> {
    if images.is_empty() {
        return Err(AppError::Validation("至少需要一张图片".to_string()));
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(images.len());

    for page in &images {
        let image_stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(page.width),
                "Height" => i64::from(page.height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            page.jpeg.clone(),
        )
        .with_compression(false);
        let image_id = doc.add_object(image_stream);

        let (pw, ph, dw, dh, x, y) = layout(spec, page.width, page.height, margin);
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        dw.into(),
                        0.into(),
                        0.into(),
                        dh.into(),
                        x.into(),
                        y.into(),
                    ],
                ),
                Operation::new("Do", vec!["Im0".into()]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), pw.into(), ph.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| AppError::Pdf(format!("PDF 序列化失败: {e}")))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_jpeg() -> PageImage {
        // 2x2 纯色图编码成 JPEG
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            2,
            2,
            image::Rgb([200, 60, 60]),
        ));
        let mut buf = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buf);
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, 90);
        img.write_with_encoder(encoder).unwrap();
        PageImage {
            jpeg: buf,
            width: 2,
            height: 2,
        }
    }

    #[test]
    fn page_spec_parse_is_case_insensitive() {
        assert_eq!(PageSpec::parse("A4").unwrap(), PageSpec::A4);
        assert_eq!(PageSpec::parse("fit").unwrap(), PageSpec::Fit);
        assert!(PageSpec::parse("tabloid").is_err());
    }

    #[test]
    fn fit_layout_adds_margins_around_image() {
        let (pw, ph, dw, dh, x, y) = layout(PageSpec::Fit, 400, 200, 10.0);
        assert_eq!((dw, dh), (300.0, 150.0));
        assert_eq!((pw, ph), (320.0, 170.0));
        assert_eq!((x, y), (10.0, 10.0));
    }

    #[test]
    fn wide_image_flips_a4_to_landscape() {
        let (pw, ph, ..) = layout(PageSpec::A4, 2000, 1000, 0.0);
        assert!(pw > ph);
    }

    #[test]
    fn small_image_is_centered_without_upscaling() {
        let (pw, ph, dw, dh, x, y) = layout(PageSpec::Letter, 100, 100, 20.0);
        assert_eq!((dw, dh), (75.0, 75.0));
        assert!((x - (pw - dw) / 2.0).abs() < 0.01);
        assert!((y - (ph - dh) / 2.0).abs() < 0.01);
    }

    #[test]
    fn build_pdf_produces_parseable_document_with_page_per_image() {
        let bytes = build_pdf(vec![tiny_jpeg(), tiny_jpeg()], PageSpec::Fit, 0.0).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn build_pdf_rejects_empty_input() {
        assert!(build_pdf(vec![], PageSpec::Fit, 0.0).is_err());
    }
}
