//! Generated image and audio fixtures
#![allow(dead_code)]

use std::path::Path;

use image::{Rgb, RgbImage};

/// A solid color test image.
#[derive(Debug, Clone, Copy)]
pub struct ImageFixture {
    pub filename: &'static str,
    pub width: u32,
    pub height: u32,
    pub color: [u8; 3],
}

/// Three images with different aspect ratios, named so their sort order is
/// the slide order.
pub const SLIDESHOW_IMAGES: &[ImageFixture] = &[
    ImageFixture {
        filename: "01_portrait.png",
        width: 60,
        height: 80,
        color: [200, 30, 30],
    },
    ImageFixture {
        filename: "02_landscape.png",
        width: 200,
        height: 50,
        color: [30, 200, 30],
    },
    ImageFixture {
        filename: "03_square.jpg",
        width: 64,
        height: 64,
        color: [30, 30, 200],
    },
];

impl ImageFixture {
    pub fn write_to(&self, dir: &Path) {
        let img = RgbImage::from_pixel(self.width, self.height, Rgb(self.color));
        img.save(dir.join(self.filename))
            .expect("Failed to write image fixture");
    }
}

/// A file with an image extension but no decodable image data.
pub fn write_corrupt_image(dir: &Path, filename: &str) {
    std::fs::write(dir.join(filename), b"definitely not a png").expect("Failed to write fixture");
}

/// A short placeholder music file; only its presence matters to fake backends.
pub fn write_music_stub(dir: &Path, filename: &str) {
    std::fs::write(dir.join(filename), b"ID3 fake audio").expect("Failed to write fixture");
}
