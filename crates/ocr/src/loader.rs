use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader, Rgb, RgbImage};
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Could not open that file as an image. Please upload a PNG, JPEG, WebP, TIFF, BMP or GIF file. ({reason})")]
    UnreadableImage { reason: String },
}

impl LoadError {
    fn unreadable(e: impl std::fmt::Display) -> Self {
        LoadError::UnreadableImage { reason: e.to_string() }
    }
}

/// A fully decoded upload.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub image: DynamicImage,
    pub format: ImageFormat,
}

impl RawImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Decode an uploaded byte buffer.
///
/// The format is sniffed from the content, not the file name. Decoding is
/// eager, EXIF orientation is applied, and transparent pixels are composited
/// onto white so they read as paper rather than ink.
pub fn load_image(data: &[u8]) -> Result<RawImage, LoadError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(LoadError::unreadable)?;
    let format = reader
        .format()
        .ok_or_else(|| LoadError::unreadable("unrecognized file signature"))?;

    let mut decoder = reader.into_decoder().map_err(LoadError::unreadable)?;
    let orientation = decoder.orientation().map_err(LoadError::unreadable)?;
    let mut image = DynamicImage::from_decoder(decoder).map_err(LoadError::unreadable)?;
    image.apply_orientation(orientation);

    if image.width() == 0 || image.height() == 0 {
        return Err(LoadError::unreadable("image has no pixels"));
    }

    let image = if image.color().has_alpha() { flatten_alpha(&image) } else { image };

    Ok(RawImage { image, format })
}

fn flatten_alpha(img: &DynamicImage) -> DynamicImage {
    let rgba = img.to_rgba8();
    let flat = RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let a = a as u32;
        let blend = |c: u8| ((c as u32 * a + 255 * (255 - a)) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    });
    DynamicImage::ImageRgb8(flat)
}
