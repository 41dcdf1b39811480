use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbImage;

use crate::models::request::GenerationRequest;
use crate::render::letterbox;
use crate::render::text::{TextLayer, TextRasterizer};
use crate::render::RenderError;

/// One image's timed, composited segment of the video.
#[derive(Debug, Clone)]
pub struct Slide {
    pub index: usize,
    pub source: PathBuf,
    base: RgbImage,
    overlay: Option<Arc<TextLayer>>,
    duration: f64,
    fade: f64,
}

impl Slide {
    pub fn new(
        index: usize,
        source: impl Into<PathBuf>,
        base: RgbImage,
        overlay: Option<Arc<TextLayer>>,
        duration: f64,
        fade: f64,
    ) -> Self {
        Self {
            index,
            source: source.into(),
            base,
            overlay,
            duration,
            fade,
        }
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.base.dimensions()
    }

    /// Text layer drawn over this slide; slides with the same overlay set
    /// share one layer.
    pub fn overlay(&self) -> Option<&Arc<TextLayer>> {
        self.overlay.as_ref()
    }

    /// Brightness multiplier of the image at `t` seconds into the slide.
    ///
    /// Linear fade in over the first `fade` seconds and out over the last.
    pub fn opacity_at(&self, t: f64) -> f64 {
        if self.fade <= 0.0 {
            return 1.0;
        }
        let fade_in = (t / self.fade).min(1.0);
        let fade_out = ((self.duration - t) / self.fade).min(1.0);
        (fade_in * fade_out).clamp(0.0, 1.0)
    }

    /// Write the frame shown `t` seconds into the slide as packed RGB24.
    ///
    /// The fade applies to the image; overlay text is drawn on top at full
    /// opacity.
    pub fn write_frame(&self, t: f64, out: &mut Vec<u8>) {
        let gain = (self.opacity_at(t) * 255.0).round() as u16;

        out.clear();
        out.reserve(self.base.as_raw().len());
        if gain >= 255 {
            out.extend_from_slice(self.base.as_raw());
        } else {
            out.extend(self.base.as_raw().iter().map(|&c| mul_div255(u16::from(c), gain) as u8));
        }

        if let Some(layer) = &self.overlay {
            for (dst, src) in out.chunks_exact_mut(3).zip(layer.rgba.chunks_exact(4)) {
                let a = u16::from(src[3]);
                if a == 0 {
                    continue;
                }
                let inv = 255 - a;
                for c in 0..3 {
                    let v = u16::from(src[c]) + mul_div255(u16::from(dst[c]), inv);
                    dst[c] = v.min(255) as u8;
                }
            }
        }
    }
}

fn mul_div255(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

/// Builds slides at a fixed canvas size and timing.
pub struct SlideBuilder<'a> {
    text: &'a TextRasterizer,
    width: u32,
    height: u32,
    duration: f64,
    transition: f64,
}

impl<'a> SlideBuilder<'a> {
    pub fn new(
        text: &'a TextRasterizer,
        (width, height): (u32, u32),
        duration: f64,
        transition: f64,
    ) -> Self {
        Self {
            text,
            width,
            height,
            duration,
            transition,
        }
    }

    /// Build one slide per image, in order.
    ///
    /// Each distinct overlay set is rasterized once and shared by every
    /// slide it applies to. Slides already built are dropped if a later
    /// image fails.
    pub fn build_all(
        &self,
        images: &[PathBuf],
        request: &GenerationRequest,
        mut on_built: impl FnMut(usize, usize),
    ) -> Result<Vec<Slide>, RenderError> {
        if images.is_empty() {
            return Err(RenderError::NoImagesFound {
                dir: request.source_dir.clone(),
            });
        }

        let mut layers: HashMap<Vec<usize>, Option<Arc<TextLayer>>> = HashMap::new();
        let mut slides = Vec::with_capacity(images.len());
        for (index, path) in images.iter().enumerate() {
            tracing::debug!(
                index,
                total = images.len(),
                image = %path.display(),
                "Building slide"
            );
            let base = letterbox::load_letterboxed(path, self.width, self.height)
                .map_err(|e| image_error(index, path, e))?;

            let key = request.overlay_indices_for(index);
            let overlay = match layers.get(&key) {
                Some(layer) => layer.clone(),
                None => {
                    let layer = self
                        .text
                        .render_layer(&request.overlays_for(index), self.width, self.height)
                        .map_err(|e| image_error(index, path, e))?
                        .map(Arc::new);
                    layers.insert(key, layer.clone());
                    layer
                }
            };

            slides.push(Slide::new(
                index,
                path,
                base,
                overlay,
                self.duration,
                self.transition,
            ));
            on_built(index + 1, images.len());
        }
        Ok(slides)
    }
}

fn image_error(index: usize, path: &Path, reason: impl ToString) -> RenderError {
    RenderError::ImageProcessing {
        index,
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
