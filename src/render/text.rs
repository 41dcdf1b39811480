use std::path::Path;
use std::sync::Arc;

use resvg::tiny_skia;
use usvg::fontdb;

use crate::models::request::{TextColor, TextOverlaySpec, TextPosition};

/// Distance in pixels between the canvas edge and top/bottom anchored text.
pub const EDGE_MARGIN: f32 = 50.0;

/// Outline width drawn outside the glyphs.
pub const OUTLINE_WIDTH: f32 = 2.0;

const PREFERRED_FAMILIES: &str = "DejaVu Sans, Liberation Sans, Arial, sans-serif";

/// Full-canvas transparent layer holding rasterized overlay text.
#[derive(Debug, Clone)]
pub struct TextLayer {
    pub width: u32,
    pub height: u32,
    /// Premultiplied RGBA8.
    pub rgba: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum TextError {
    #[error("failed to build text overlay: {0}")]
    Svg(#[from] usvg::Error),

    #[error("cannot allocate a {0}x{1} text layer")]
    Canvas(u32, u32),
}

/// Rasterizes overlay text with system fonts.
pub struct TextRasterizer {
    fontdb: Arc<fontdb::Database>,
}

impl Default for TextRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextRasterizer {
    /// Load system fonts plus any fonts in `./fonts`.
    pub fn new() -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        load_fonts_from_dir(&mut db, Path::new("fonts"));

        if db.is_empty() {
            tracing::warn!("No fonts found; text overlays will render empty");
        } else {
            tracing::debug!(faces = db.len(), "Loaded fonts for text overlays");
        }

        Self::from_database(db)
    }

    pub fn from_database(db: fontdb::Database) -> Self {
        Self {
            fontdb: Arc::new(db),
        }
    }

    pub fn has_fonts(&self) -> bool {
        !self.fontdb.is_empty()
    }

    /// Rasterize `overlays` in order onto one `width`x`height` layer.
    ///
    /// Returns `None` when there is nothing to draw.
    pub fn render_layer(
        &self,
        overlays: &[&TextOverlaySpec],
        width: u32,
        height: u32,
    ) -> Result<Option<TextLayer>, TextError> {
        if overlays.is_empty() {
            return Ok(None);
        }

        let mut pixmap =
            tiny_skia::Pixmap::new(width, height).ok_or(TextError::Canvas(width, height))?;
        let options = usvg::Options {
            fontdb: Arc::clone(&self.fontdb),
            font_resolver: fallback_font_resolver(),
            ..Default::default()
        };

        for overlay in overlays {
            let svg = overlay_svg(overlay, width, height);
            let tree = usvg::Tree::from_str(&svg, &options)?;
            if !tree.root().has_children() {
                tracing::warn!(text = %overlay.text, "Overlay produced no glyphs");
                continue;
            }

            // Position from the filled glyph box; the outline extends past it.
            let bbox = tree.root().abs_bounding_box();
            let (x, y) = anchor_origin(
                overlay.position,
                (width as f32, height as f32),
                (bbox.width(), bbox.height()),
            );
            let transform = tiny_skia::Transform::from_translate(x - bbox.x(), y - bbox.y());
            resvg::render(&tree, transform, &mut pixmap.as_mut());
        }

        Ok(Some(TextLayer {
            width,
            height,
            rgba: pixmap.take(),
        }))
    }
}

/// Top-left corner of a `text` sized box inside `canvas` for `position`.
///
/// Horizontal placement is always centered on the rendered width.
pub fn anchor_origin(position: TextPosition, canvas: (f32, f32), text: (f32, f32)) -> (f32, f32) {
    let (cw, ch) = canvas;
    let (tw, th) = text;
    let x = ((cw - tw) / 2.0).floor();
    let y = match position {
        TextPosition::Top => EDGE_MARGIN,
        TextPosition::Center => ((ch - th) / 2.0).floor(),
        TextPosition::Bottom => ch - th - EDGE_MARGIN,
    };
    (x, y)
}

fn overlay_svg(overlay: &TextOverlaySpec, width: u32, height: u32) -> String {
    // Stroke is centered on the outline; painting it first and doubling the
    // width leaves OUTLINE_WIDTH visible outside the glyph.
    format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}">"#,
            r#"<text x="0" y="0" font-family="{family}" font-weight="bold" font-size="{size}" "#,
            r#"fill="{fill}" stroke="{stroke}" stroke-width="{stroke_width}" "#,
            r#"stroke-linejoin="round" paint-order="stroke">{text}</text></svg>"#
        ),
        w = width,
        h = height,
        family = PREFERRED_FAMILIES,
        size = overlay.font_size,
        fill = hex(overlay.color),
        stroke = hex(overlay.color.outline()),
        stroke_width = OUTLINE_WIDTH * 2.0,
        text = escape_xml(&overlay.text),
    )
}

fn hex(color: TextColor) -> String {
    let [r, g, b] = color.rgb();
    format!("#{r:02x}{g:02x}{b:02x}")
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

fn load_fonts_from_dir(db: &mut fontdb::Database, dir: &Path) {
    let Ok(rd) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in rd.flatten() {
        let path = entry.path();
        let is_font = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "ttf" | "otf" | "ttc"))
            .unwrap_or(false);
        if is_font && path.is_file() {
            let _ = db.load_font_file(&path);
        }
    }
}

/// Requested families first, then generic families, then any loaded face.
fn fallback_font_resolver() -> usvg::FontResolver<'static> {
    usvg::FontResolver {
        select_font: Box::new(|font, fontdb| {
            let mut families = Vec::<fontdb::Family<'_>>::new();
            for family in font.families() {
                families.push(match family {
                    usvg::FontFamily::Serif => fontdb::Family::Serif,
                    usvg::FontFamily::SansSerif => fontdb::Family::SansSerif,
                    usvg::FontFamily::Cursive => fontdb::Family::Cursive,
                    usvg::FontFamily::Fantasy => fontdb::Family::Fantasy,
                    usvg::FontFamily::Monospace => fontdb::Family::Monospace,
                    usvg::FontFamily::Named(s) => fontdb::Family::Name(s),
                });
            }
            families.push(fontdb::Family::SansSerif);

            let query = fontdb::Query {
                families: &families,
                weight: fontdb::Weight(font.weight()),
                stretch: fontdb::Stretch::Normal,
                style: fontdb::Style::Normal,
            };

            fontdb
                .query(&query)
                .or_else(|| fontdb.faces().next().map(|f| f.id))
        }),
        select_fallback: usvg::FontResolver::default_fallback_selector(),
    }
}
