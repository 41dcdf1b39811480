use std::path::Path;

use image::imageops::{self, FilterType};
use image::{ImageError, RgbImage};

/// Placement of a scaled image inside the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fit {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

/// Fit a `src_w`x`src_h` image inside `target_w`x`target_h` without cropping.
///
/// Images wider than the target aspect fill the width, all others fill the
/// height. The scaled image is centered; leftover bands split evenly with the
/// odd pixel going to the right/bottom band.
pub fn fit_within(src_w: u32, src_h: u32, target_w: u32, target_h: u32) -> Fit {
    // Aspect comparison done as a cross product to stay exact in integers.
    let (sw, sh) = (u64::from(src_w.max(1)), u64::from(src_h.max(1)));
    let (tw, th) = (u64::from(target_w), u64::from(target_h));

    let (width, height) = if sw * th > tw * sh {
        (tw, tw * sh / sw)
    } else {
        (th * sw / sh, th)
    };
    let width = (width as u32).clamp(1, target_w.max(1));
    let height = (height as u32).clamp(1, target_h.max(1));

    Fit {
        width,
        height,
        x: target_w.saturating_sub(width) / 2,
        y: target_h.saturating_sub(height) / 2,
    }
}

/// Load `path` and letterbox it onto a black RGB canvas of exactly
/// `target_w`x`target_h`.
pub fn load_letterboxed(path: &Path, target_w: u32, target_h: u32) -> Result<RgbImage, ImageError> {
    let source = image::open(path)?.to_rgb8();
    Ok(letterbox(&source, target_w, target_h))
}

pub fn letterbox(source: &RgbImage, target_w: u32, target_h: u32) -> RgbImage {
    let fit = fit_within(source.width(), source.height(), target_w, target_h);
    let scaled = if (fit.width, fit.height) == source.dimensions() {
        source.clone()
    } else {
        imageops::resize(source, fit.width, fit.height, FilterType::Lanczos3)
    };

    let mut canvas = RgbImage::new(target_w, target_h);
    imageops::replace(&mut canvas, &scaled, i64::from(fit.x), i64::from(fit.y));
    canvas
}
