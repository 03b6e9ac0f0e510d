use std::io::Cursor;

use image::{GrayImage, ImageFormat, Luma, imageops::FilterType};

use crate::{DataUrl, DataUrlError};

pub const FOREGROUND: Luma<u8> = Luma([255]);
pub const BACKGROUND: Luma<u8> = Luma([0]);

/// Encoded binary mask (PNG data url). White marks pixels to be removed.
///
/// Copies are cheap and share the encoded bytes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MaskRef(DataUrl);

#[derive(Debug, thiserror::Error)]
pub enum MaskError {
    #[error(transparent)]
    DataUrl(#[from] DataUrlError),
    #[error("mask is not a valid image: {0}")]
    Image(#[from] image::ImageError),
}

impl MaskRef {
    pub fn encode(mask: &GrayImage) -> Result<Self, MaskError> {
        let mut png = Vec::new();
        mask.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(Self(DataUrl::encode("image/png", &png)))
    }

    pub fn from_data_url(url: DataUrl) -> Self {
        Self(url)
    }

    pub fn parse(s: &str) -> Result<Self, MaskError> {
        Ok(Self(DataUrl::parse(s)?))
    }

    /// Decodes to a strict black/white image. Anything which is not black counts as foreground,
    /// so masks produced elsewhere (e.g. rgb or with alpha) are accepted too.
    pub fn decode(&self) -> Result<GrayImage, MaskError> {
        let bytes = self.0.decode()?;
        let mut mask = image::load_from_memory(&bytes)?.to_luma8();
        binarize_in_place(&mut mask);
        Ok(mask)
    }

    /// Decodes and fits the mask onto an image of `width` x `height`.
    pub fn decode_sized(&self, width: u32, height: u32) -> Result<GrayImage, MaskError> {
        let mask = self.decode()?;
        if mask.dimensions() == (width, height) {
            return Ok(mask);
        }
        log::debug!("Scaling mask {:?} to {width}x{height}", mask.dimensions());
        Ok(image::imageops::resize(&mask, width, height, FilterType::Nearest))
    }

    pub fn data_url(&self) -> &DataUrl {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn shares_bytes_with(&self, other: &MaskRef) -> bool {
        self.0.ptr_eq(&other.0)
    }
}

fn binarize_in_place(mask: &mut GrayImage) {
    for Luma([v]) in mask.pixels_mut() {
        *v = if *v > 0 { 255 } else { 0 };
    }
}

pub fn is_binary(mask: &GrayImage) -> bool {
    mask.pixels().all(|p| *p == FOREGROUND || *p == BACKGROUND)
}

pub fn foreground_count(mask: &GrayImage) -> usize {
    mask.pixels().filter(|p| **p == FOREGROUND).count()
}
