//! Single-page PDF generation from PNG and JPEG images.
//!
//! The decoded raster is embedded as an `/XObject /Image` (8 bits per
//! component, DeviceRGB or DeviceGray). Transparency becomes an `/SMask`.
//! All streams are Flate-compressed by `Document::compress`.

use image::{DynamicImage, GenericImageView, ImageFormat};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream};

use crate::config::ConversionConfig;
use crate::error::{Error, Result};

/// Resource name of the embedded picture
const IMAGE_NAME: &str = "Im1";

/// Points per inch
const POINTS_PER_INCH: f32 = 72.0;

/// Convert PNG or JPEG bytes into a one-page PDF.
pub fn image_to_pdf(data: &[u8], config: &ConversionConfig) -> Result<Vec<u8>> {
    let format = image::guess_format(data).map_err(|e| Error::ImageDecode(e.to_string()))?;
    if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg) {
        return Err(Error::UnsupportedImage(format!("{format:?}")));
    }

    let img = image::load_from_memory_with_format(data, format)
        .map_err(|e| Error::ImageDecode(e.to_string()))?;

    let raster = Raster::from_image(&img)?;
    let layout = PageLayout::new(raster.width, raster.height, config);
    build_document(raster, &layout)
}

/// Decoded pixels ready to embed
struct Raster {
    width: u32,
    height: u32,
    color_space: &'static str,
    pixels: Vec<u8>,
    /// Alpha channel, only kept when some pixel is not fully opaque
    alpha: Option<Vec<u8>>,
}

impl Raster {
    fn from_image(img: &DynamicImage) -> Result<Self> {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::ImageDecode("image has no pixels".to_string()));
        }

        let color = img.color();
        let (color_space, pixels) = if color.has_color() {
            ("DeviceRGB", img.to_rgb8().into_raw())
        } else {
            ("DeviceGray", img.to_luma8().into_raw())
        };

        let alpha = if color.has_alpha() {
            let alpha: Vec<u8> = img.to_rgba8().pixels().map(|p| p.0[3]).collect();
            alpha.iter().any(|&a| a != u8::MAX).then_some(alpha)
        } else {
            None
        };

        Ok(Self {
            width,
            height,
            color_space,
            pixels,
            alpha,
        })
    }
}

/// Page size and image placement, in points
#[derive(Debug, Clone, Copy, PartialEq)]
struct PageLayout {
    page_width: f32,
    page_height: f32,
    x: f32,
    y: f32,
    draw_width: f32,
    draw_height: f32,
}

impl PageLayout {
    #[allow(clippy::cast_precision_loss)]
    fn new(width: u32, height: u32, config: &ConversionConfig) -> Self {
        let (width, height) = (width as f32, height as f32);

        match config.page_size.dimensions() {
            None => {
                let scale = POINTS_PER_INCH / config.dpi;
                let (page_width, page_height) = (width * scale, height * scale);
                Self {
                    page_width,
                    page_height,
                    x: 0.0,
                    y: 0.0,
                    draw_width: page_width,
                    draw_height: page_height,
                }
            }
            Some((page_width, page_height)) => {
                let avail_width = (page_width - 2.0 * config.margin).max(1.0);
                let avail_height = (page_height - 2.0 * config.margin).max(1.0);
                let scale = (avail_width / width).min(avail_height / height);
                let (draw_width, draw_height) = (width * scale, height * scale);
                Self {
                    page_width,
                    page_height,
                    x: (page_width - draw_width) / 2.0,
                    y: (page_height - draw_height) / 2.0,
                    draw_width,
                    draw_height,
                }
            }
        }
    }
}

fn name(value: &str) -> Object {
    Object::Name(value.as_bytes().to_vec())
}

fn build_document(raster: Raster, layout: &PageLayout) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut image_dict = Dictionary::from_iter([
        ("Type", name("XObject")),
        ("Subtype", name("Image")),
        ("Width", Object::Integer(i64::from(raster.width))),
        ("Height", Object::Integer(i64::from(raster.height))),
        ("ColorSpace", name(raster.color_space)),
        ("BitsPerComponent", Object::Integer(8)),
    ]);

    if let Some(alpha) = raster.alpha {
        let smask_dict = Dictionary::from_iter([
            ("Type", name("XObject")),
            ("Subtype", name("Image")),
            ("Width", Object::Integer(i64::from(raster.width))),
            ("Height", Object::Integer(i64::from(raster.height))),
            ("ColorSpace", name("DeviceGray")),
            ("BitsPerComponent", Object::Integer(8)),
        ]);
        let smask_id = doc.add_object(Stream::new(smask_dict, alpha));
        image_dict.set("SMask", Object::Reference(smask_id));
    }

    let image_id = doc.add_object(Stream::new(image_dict, raster.pixels));

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(layout.draw_width),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(layout.draw_height),
                    Object::Real(layout.x),
                    Object::Real(layout.y),
                ],
            ),
            Operation::new("Do", vec![name(IMAGE_NAME)]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_bytes = content
        .encode()
        .map_err(|e| Error::Lopdf(format!("Failed to encode page content: {e}")))?;
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content_bytes));

    let resources = Dictionary::from_iter([(
        "XObject",
        Object::Dictionary(Dictionary::from_iter([(IMAGE_NAME, Object::Reference(image_id))])),
    )]);

    let page_id = doc.add_object(Dictionary::from_iter([
        ("Type", name("Page")),
        ("Parent", Object::Reference(pages_id)),
        ("Contents", Object::Reference(content_id)),
        ("Resources", Object::Dictionary(resources)),
        (
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(layout.page_width),
                Object::Real(layout.page_height),
            ]),
        ),
    ]));

    let pages = Dictionary::from_iter([
        ("Type", name("Pages")),
        ("Kids", Object::Array(vec![Object::Reference(page_id)])),
        ("Count", Object::Integer(1)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(Dictionary::from_iter([
        ("Type", name("Catalog")),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    doc.compress();

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| Error::PdfSave(format!("Failed to save converted image: {e}")))?;

    Ok(output)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::config::PageSize;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
        buf
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 30, 30]));
        encode(DynamicImage::ImageRgb8(img), ImageFormat::Png)
    }

    fn media_box(doc: &Document) -> Vec<f32> {
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);
        let page_id = *pages.values().next().unwrap();
        doc.get_dictionary(page_id)
            .unwrap()
            .get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_float().unwrap())
            .collect()
    }

    fn image_dict(doc: &Document) -> Dictionary {
        doc.objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .find(|s| {
                s.dict.get(b"Subtype").and_then(Object::as_name).ok() == Some(b"Image".as_slice())
            })
            .map(|s| s.dict.clone())
            .unwrap()
    }

    #[test]
    fn test_png_page_matches_image_size() {
        let pdf = image_to_pdf(&png(40, 20), &ConversionConfig::default()).unwrap();
        let doc = Document::load_mem(&pdf).unwrap();
        assert_eq!(media_box(&doc), vec![0.0, 0.0, 40.0, 20.0]);
    }

    #[test]
    fn test_dpi_scales_page() {
        let config = ConversionConfig {
            dpi: 144.0,
            ..Default::default()
        };
        let pdf = image_to_pdf(&png(40, 20), &config).unwrap();
        let doc = Document::load_mem(&pdf).unwrap();
        assert_eq!(media_box(&doc), vec![0.0, 0.0, 20.0, 10.0]);
    }

    #[test]
    fn test_jpeg_converts() {
        let img = RgbImage::from_pixel(16, 16, Rgb([10, 120, 240]));
        let jpeg = encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg);
        let pdf = image_to_pdf(&jpeg, &ConversionConfig::default()).unwrap();

        let doc = Document::load_mem(&pdf).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        let dict = image_dict(&doc);
        assert_eq!(dict.get(b"ColorSpace").unwrap().as_name().unwrap(), b"DeviceRGB");
    }

    #[test]
    fn test_grayscale_uses_device_gray() {
        let img = GrayImage::from_pixel(8, 8, Luma([128]));
        let data = encode(DynamicImage::ImageLuma8(img), ImageFormat::Png);
        let pdf = image_to_pdf(&data, &ConversionConfig::default()).unwrap();

        let doc = Document::load_mem(&pdf).unwrap();
        let gray_images = doc
            .objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .filter(|s| {
                s.dict.get(b"ColorSpace").and_then(Object::as_name).ok()
                    == Some(b"DeviceGray".as_slice())
            })
            .count();
        assert_eq!(gray_images, 1);
    }

    #[test]
    fn test_transparency_adds_smask() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        img.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        let data = encode(DynamicImage::ImageRgba8(img), ImageFormat::Png);
        let pdf = image_to_pdf(&data, &ConversionConfig::default()).unwrap();

        let doc = Document::load_mem(&pdf).unwrap();
        let has_smask = doc
            .objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .any(|s| s.dict.has(b"SMask"));
        assert!(has_smask);
    }

    #[test]
    fn test_opaque_alpha_skips_smask() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let data = encode(DynamicImage::ImageRgba8(img), ImageFormat::Png);
        let pdf = image_to_pdf(&data, &ConversionConfig::default()).unwrap();

        let doc = Document::load_mem(&pdf).unwrap();
        let has_smask = doc
            .objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .any(|s| s.dict.has(b"SMask"));
        assert!(!has_smask);
    }

    #[test]
    fn test_fixed_page_fits_and_centers() {
        let config = ConversionConfig {
            page_size: PageSize::Letter,
            margin: 36.0,
            ..Default::default()
        };
        // Wide image: limited by width
        let layout = PageLayout::new(1080, 540, &config);
        assert_eq!(layout.page_width, 612.0);
        assert_eq!(layout.page_height, 792.0);
        assert!((layout.draw_width - 540.0).abs() < 0.01);
        assert!((layout.draw_height - 270.0).abs() < 0.01);
        assert!((layout.x - 36.0).abs() < 0.01);
        assert!((layout.y - 261.0).abs() < 0.01);
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let result = image_to_pdf(b"definitely not an image", &ConversionConfig::default());
        assert!(matches!(result, Err(Error::ImageDecode(_))));
    }

    #[test]
    fn test_truncated_png_is_decode_error() {
        let data = png(10, 10);
        let result = image_to_pdf(&data[..20], &ConversionConfig::default());
        assert!(matches!(result, Err(Error::ImageDecode(_))));
    }

    #[test]
    fn test_gif_is_unsupported() {
        let result = image_to_pdf(b"GIF89a\x01\x00\x01\x00", &ConversionConfig::default());
        assert!(matches!(result, Err(Error::UnsupportedImage(_))));
    }

    #[test]
    fn test_output_is_deterministic() {
        let data = png(12, 7);
        let a = image_to_pdf(&data, &ConversionConfig::default()).unwrap();
        let b = image_to_pdf(&data, &ConversionConfig::default()).unwrap();
        assert_eq!(a, b);
    }
}
