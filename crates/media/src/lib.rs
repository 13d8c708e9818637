//! Image redaction: Gaussian blur and JPEG re-encode.

pub mod blur;
pub mod error;

pub use {
    blur::{BlurRedactor, DEFAULT_JPEG_QUALITY, blur_image},
    error::{Error, Result},
};
