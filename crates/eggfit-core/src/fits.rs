//! Single-image FITS files (primary HDU only), through `fitsio`.
//!
//! Pixels are read as physical `f64` values in row-major order, with
//! `width = NAXIS1` and `height = NAXIS2`. Fresh files are written as
//! `BITPIX = -64`; [`FitsImage::write_over`] instead copies a template file
//! so its header survives, then replaces the pixels and updates the cards
//! held in [`FitsImage::header`].

use std::ffi::CString;
use std::fs;
use std::os::raw::c_int;
use std::path::Path;
use std::ptr;

use fitsio::hdu::FitsHdu;
use fitsio::images::{ImageDescription, ImageType};
use fitsio::FitsFile;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum FitsError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Fitsio(#[from] fitsio::errors::Error),
    #[error("expected a 2-D image, found {0} axes")]
    Dimensions(usize),
    #[error("image data has {got} pixels, expected {expected}")]
    DataLength { expected: usize, got: usize },
    #[error("image is {got:?} (width, height), template is {expected:?}")]
    Shape {
        expected: (usize, usize),
        got: (usize, usize),
    },
    #[error("header card {0:?} cannot be written")]
    InvalidCard(String),
    #[error("cfitsio status {status} while updating {keyword}")]
    Status { keyword: String, status: i32 },
}

/// A typed header value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum HeaderValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl HeaderValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Float(v) => Some(*v),
            HeaderValue::Integer(v) => Some(*v as f64),
            HeaderValue::Text(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            HeaderValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for HeaderValue {
    fn from(v: f64) -> Self {
        HeaderValue::Float(v)
    }
}

impl From<i64> for HeaderValue {
    fn from(v: i64) -> Self {
        HeaderValue::Integer(v)
    }
}

impl From<&str> for HeaderValue {
    fn from(v: &str) -> Self {
        HeaderValue::Text(v.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeaderCard {
    pub keyword: String,
    pub value: HeaderValue,
    pub comment: Option<String>,
}

impl HeaderCard {
    pub fn new(keyword: &str, value: HeaderValue) -> Self {
        Self {
            keyword: keyword.to_ascii_uppercase(),
            value,
            comment: None,
        }
    }

    /// Insert or replace this card in the current HDU of `fptr`.
    fn update(&self, fptr: &mut FitsFile) -> Result<(), FitsError> {
        let invalid = || FitsError::InvalidCard(self.keyword.clone());
        let keyword = CString::new(self.keyword.as_str()).map_err(|_| invalid())?;
        let comment = match &self.comment {
            Some(c) => Some(CString::new(c.as_str()).map_err(|_| invalid())?),
            None => None,
        };
        let text = match &self.value {
            HeaderValue::Text(s) => Some(CString::new(s.as_str()).map_err(|_| invalid())?),
            _ => None,
        };
        let comment_ptr = comment.as_ref().map_or(ptr::null(), |c| c.as_ptr());

        // Update in place; `write_key` would append a duplicate card.
        let mut status: c_int = 0;
        // SAFETY: `fptr` is an open file borrowed mutably for the whole
        // block, and every C string outlives the call that reads it.
        unsafe {
            let raw = fptr.as_raw();
            match (&self.value, &text) {
                (HeaderValue::Integer(v), _) => {
                    fitsio::sys::ffukyj(raw, keyword.as_ptr(), *v, comment_ptr, &mut status);
                }
                (HeaderValue::Float(v), _) => {
                    fitsio::sys::ffukyd(raw, keyword.as_ptr(), *v, -15, comment_ptr, &mut status);
                }
                (HeaderValue::Text(_), Some(text)) => {
                    fitsio::sys::ffukys(
                        raw,
                        keyword.as_ptr(),
                        text.as_ptr(),
                        comment_ptr,
                        &mut status,
                    );
                }
                (HeaderValue::Text(_), None) => return Err(invalid()),
            }
        }
        if status != 0 {
            return Err(FitsError::Status {
                keyword: self.keyword.clone(),
                status,
            });
        }
        Ok(())
    }
}

/// Header cards to write alongside an image, in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FitsHeader {
    cards: Vec<HeaderCard>,
}

impl FitsHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the named keywords from the primary HDU of `path`.
    ///
    /// Missing keywords are skipped. Values cfitsio can convert to a number
    /// become `Float`, the rest `Text`.
    pub fn read(path: impl AsRef<Path>, keywords: &[&str]) -> Result<Self, FitsError> {
        let mut fptr = FitsFile::open(path.as_ref())?;
        let hdu = fptr.primary_hdu()?;
        let mut header = Self::new();
        for &keyword in keywords {
            if let Ok(v) = hdu.read_key::<f64>(&mut fptr, keyword) {
                header.set(keyword, v);
            } else if let Ok(text) = hdu.read_key::<String>(&mut fptr, keyword) {
                header.set(keyword, HeaderValue::Text(text.trim_end().to_string()));
            }
        }
        Ok(header)
    }

    pub fn cards(&self) -> &[HeaderCard] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.cards
            .iter()
            .find(|c| c.keyword.eq_ignore_ascii_case(key))
            .map(|c| &c.value)
    }

    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(HeaderValue::as_f64)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(HeaderValue::as_i64)
    }

    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(HeaderValue::as_str)
    }

    /// Replace the value of `key` in place, or append a new card.
    pub fn set(&mut self, key: &str, value: impl Into<HeaderValue>) {
        let value = value.into();
        match self
            .cards
            .iter_mut()
            .find(|c| c.keyword.eq_ignore_ascii_case(key))
        {
            Some(card) => card.value = value,
            None => self.cards.push(HeaderCard::new(key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<HeaderValue> {
        let pos = self
            .cards
            .iter()
            .position(|c| c.keyword.eq_ignore_ascii_case(key))?;
        Some(self.cards.remove(pos).value)
    }

    fn apply(&self, fptr: &mut FitsFile) -> Result<(), FitsError> {
        for card in &self.cards {
            card.update(fptr)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FitsImage {
    pub width: usize,
    pub height: usize,
    /// Row-major pixels, `data[y * width + x]`.
    pub data: Vec<f64>,
    pub header: FitsHeader,
}

impl FitsImage {
    pub fn new(width: usize, height: usize, data: Vec<f64>) -> Result<Self, FitsError> {
        let expected = width * height;
        if data.len() != expected || expected == 0 {
            return Err(FitsError::DataLength {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
            header: FitsHeader::new(),
        })
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<f64> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    /// Read the primary image; `header` starts empty.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, FitsError> {
        let mut fptr = FitsFile::open(path.as_ref())?;
        let hdu = fptr.primary_hdu()?;
        let (width, height) = primary_shape(&mut fptr, &hdu)?;
        let data: Vec<f64> = hdu.read_image(&mut fptr)?;
        Self::new(width, height, data)
    }

    /// Write a new `BITPIX = -64` file, replacing any existing one.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), FitsError> {
        let description = ImageDescription {
            data_type: ImageType::Double,
            dimensions: &[self.height, self.width],
        };
        let mut fptr = FitsFile::create(path.as_ref())
            .with_custom_primary(&description)
            .overwrite()
            .open()?;
        let hdu = fptr.primary_hdu()?;
        hdu.write_image(&mut fptr, &self.data)?;
        self.header.apply(&mut fptr)
    }

    /// Write `path` as a copy of `template` carrying these pixels.
    ///
    /// Every template card is kept, including `BITPIX`; cards in `header`
    /// replace their template counterparts. The template image must have the
    /// same shape.
    pub fn write_over(
        &self,
        template: impl AsRef<Path>,
        path: impl AsRef<Path>,
    ) -> Result<(), FitsError> {
        let (template, path) = (template.as_ref(), path.as_ref());
        if template != path {
            fs::copy(template, path)?;
        }
        let mut fptr = FitsFile::edit(path)?;
        let hdu = fptr.primary_hdu()?;
        let (width, height) = primary_shape(&mut fptr, &hdu)?;
        if (width, height) != (self.width, self.height) {
            return Err(FitsError::Shape {
                expected: (width, height),
                got: (self.width, self.height),
            });
        }
        hdu.write_image(&mut fptr, &self.data)?;
        self.header.apply(&mut fptr)
    }
}

/// `(width, height)` of a 2-D image HDU, from its NAXIS cards.
fn primary_shape(fptr: &mut FitsFile, hdu: &FitsHdu) -> Result<(usize, usize), FitsError> {
    let naxis = hdu.read_key::<i64>(fptr, "NAXIS")?;
    if naxis != 2 {
        return Err(FitsError::Dimensions(naxis.max(0) as usize));
    }
    let width = hdu.read_key::<i64>(fptr, "NAXIS1")?;
    let height = hdu.read_key::<i64>(fptr, "NAXIS2")?;
    Ok((width.max(0) as usize, height.max(0) as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FitsImage {
        let mut img = FitsImage::new(3, 2, vec![0.0, 1.5, -2.0, 3.25, 1e-3, 42.0]).expect("image");
        img.header.set("OBJECT", "egg");
        img.header.set("EXPTIME", 300.0);
        img.header.set("NCOMBINE", 4i64);
        img
    }

    #[test]
    fn write_then_read_keeps_pixels_and_cards() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sky.fits");
        let img = sample();
        img.write(&path).expect("write");

        let back = FitsImage::read(&path).expect("read");
        assert_eq!((back.width, back.height), (3, 2));
        assert_eq!(back.data, img.data);
        assert_eq!(back.pixel(2, 1), Some(42.0));
        assert_eq!(back.pixel(3, 0), None);
        assert!(back.header.is_empty());

        let header =
            FitsHeader::read(&path, &["OBJECT", "EXPTIME", "NCOMBINE", "MISSING"]).expect("cards");
        assert_eq!(header.len(), 3);
        assert_eq!(header.get_text("OBJECT"), Some("egg"));
        assert_eq!(header.get_float("EXPTIME"), Some(300.0));
        assert_eq!(header.get_float("NCOMBINE"), Some(4.0));
        assert_eq!(header.get("MISSING"), None);
    }

    #[test]
    fn write_over_keeps_template_cards_and_updates_others() {
        let dir = tempfile::tempdir().expect("tempdir");
        let template = dir.path().join("rate.fits");
        let mut rate = sample();
        rate.header.set("BUNIT", "DN/s");
        rate.write(&template).expect("template");

        let mut counts = FitsImage::new(3, 2, vec![1.0; 6]).expect("image");
        counts.header.set("BUNIT", "DN");
        counts.header.set("EXPTIME", 2.0);
        let out = dir.path().join("counts.fits");
        counts.write_over(&template, &out).expect("write over");

        let back = FitsImage::read(&out).expect("read");
        assert_eq!(back.data, vec![1.0; 6]);
        let header = FitsHeader::read(&out, &["BUNIT", "EXPTIME", "OBJECT"]).expect("cards");
        assert_eq!(header.get_text("BUNIT"), Some("DN"));
        assert_eq!(header.get_float("EXPTIME"), Some(2.0));
        assert_eq!(header.get_text("OBJECT"), Some("egg"));

        // The template itself is untouched.
        let original = FitsHeader::read(&template, &["BUNIT"]).expect("cards");
        assert_eq!(original.get_text("BUNIT"), Some("DN/s"));
    }

    #[test]
    fn write_over_rejects_shape_mismatch() {
        let dir = tempfile::tempdir().expect("tempdir");
        let template = dir.path().join("rate.fits");
        sample().write(&template).expect("template");
        let other = FitsImage::new(2, 3, vec![0.0; 6]).expect("image");
        assert!(matches!(
            other.write_over(&template, dir.path().join("out.fits")),
            Err(FitsError::Shape {
                expected: (3, 2),
                got: (2, 3)
            })
        ));
    }

    #[test]
    fn integer_images_read_as_floats() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("int.fits");
        let description = ImageDescription {
            data_type: ImageType::Long,
            dimensions: &[2, 2],
        };
        let mut fptr = FitsFile::create(&path)
            .with_custom_primary(&description)
            .open()
            .expect("create");
        let hdu = fptr.primary_hdu().expect("hdu");
        hdu.write_image(&mut fptr, &[1i32, -2, 3, 40_000])
            .expect("write");
        drop(fptr);

        let img = FitsImage::read(&path).expect("read");
        assert_eq!(img.data, vec![1.0, -2.0, 3.0, 40_000.0]);
    }

    #[test]
    fn empty_primary_is_not_a_2d_image() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("empty.fits");
        FitsFile::create(&path).open().expect("create");
        assert!(matches!(
            FitsImage::read(&path),
            Err(FitsError::Dimensions(0))
        ));
    }

    #[test]
    fn set_updates_existing_card_in_place() {
        let mut header = FitsHeader::new();
        header.set("exptime", 1.0);
        header.set("BUNIT", "DN/s");
        header.set("EXPTIME", 5.0);
        assert_eq!(header.len(), 2);
        assert_eq!(header.cards()[0].keyword, "EXPTIME");
        assert_eq!(header.get_float("exptime"), Some(5.0));
        assert_eq!(header.remove("bunit"), Some(HeaderValue::Text("DN/s".into())));
        assert_eq!(header.get("BUNIT"), None);
    }

    #[test]
    fn new_checks_pixel_count() {
        assert!(matches!(
            FitsImage::new(2, 2, vec![0.0; 3]),
            Err(FitsError::DataLength {
                expected: 4,
                got: 3
            })
        ));
        assert!(FitsImage::new(0, 0, Vec::new()).is_err());
    }
}
