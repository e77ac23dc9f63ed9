use std::{cell::Cell, rc::Rc};

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::{
    color::{ColorRequest, ColorResolver, ColorSubscription, Rgb},
    glyph::{GlyphTable, GLYPH_COLUMNS, GLYPH_ROWS},
};

/// Horizontal cell advance per character: glyph width plus one spacing column.
pub const CELL_ADVANCE: u32 = GLYPH_COLUMNS as u32 + 1;

/// Everything needed to rasterize one string. Immutable per render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub text: String,
    pub pixel_size: u32,
    pub color: ColorRequest,
    pub bold: bool,
}

impl RenderRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            pixel_size: 3,
            color: ColorRequest::default(),
            bold: false,
        }
    }

    pub fn pixel_size(mut self, pixel_size: u32) -> Self {
        self.pixel_size = pixel_size.max(1);
        self
    }

    pub fn color(mut self, color: impl Into<ColorRequest>) -> Self {
        self.color = color.into();
        self
    }

    pub fn bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    fn scale(&self) -> u32 {
        self.pixel_size.max(1)
    }

    fn gap(&self) -> u32 {
        if self.bold {
            0
        } else {
            1
        }
    }
}

/// One filled square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub size: u32,
}

/// Rasterized string: buffer dimensions, fill color and the squares to paint.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub color: Rgb,
    pub rects: Vec<PixelRect>,
}

impl Raster {
    /// Paints the squares on a transparent canvas of the raster's size.
    pub fn to_rgba_image(&self) -> RgbaImage {
        let mut canvas = RgbaImage::new(self.width, self.height);
        let Rgb(r, g, b) = self.color;
        let fill = Rgba([r, g, b, 255]);

        for rect in &self.rects {
            let x_end = rect.x.saturating_add(rect.size).min(self.width);
            let y_end = rect.y.saturating_add(rect.size).min(self.height);
            for y in rect.y..y_end {
                for x in rect.x..x_end {
                    canvas.put_pixel(x, y, fill);
                }
            }
        }
        canvas
    }
}

/// Pixel-font text rasterizer.
#[derive(Debug, Clone)]
pub struct Rasterizer {
    resolver: ColorResolver,
}

impl Rasterizer {
    pub fn new(resolver: ColorResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &ColorResolver {
        &self.resolver
    }

    /// Resolves the request color once and lays out every lit glyph cell.
    pub fn render(&self, request: &RenderRequest) -> Raster {
        let color = self.resolver.resolve(request.color);
        layout(request, color)
    }
}

/// Pure layout step, independent of color resolution.
///
/// Geometry saturates: any coordinate or dimension past `u32::MAX` is
/// clamped to `u32::MAX`, so oversized requests keep every lit cell.
pub fn layout(request: &RenderRequest, color: Rgb) -> Raster {
    let text = request.text.to_uppercase();
    let scale = request.scale();
    let size = scale - request.gap();
    let char_count = clamp_u32(text.chars().count());

    let mut rects = Vec::new();
    if size > 0 {
        for (index, ch) in text.chars().enumerate() {
            let glyph = GlyphTable::lookup(ch);
            let origin = clamp_u32(index).saturating_mul(CELL_ADVANCE);
            rects.extend(glyph.cells().map(|(row, col)| PixelRect {
                x: origin.saturating_add(col as u32).saturating_mul(scale),
                y: (row as u32).saturating_mul(scale),
                size,
            }));
        }
    }

    Raster {
        width: CELL_ADVANCE.saturating_mul(char_count).saturating_mul(scale),
        height: (GLYPH_ROWS as u32).saturating_mul(scale),
        color,
        rects,
    }
}

fn clamp_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Retained pixel text element.
///
/// Holds the latest props and a subscription on the theme/highlight
/// attributes; [`PixelText::frame`] re-renders only when a prop changed or
/// the subscription flagged an external change.
pub struct PixelText {
    rasterizer: Rasterizer,
    request: RenderRequest,
    dirty: Rc<Cell<bool>>,
    cached: Option<Raster>,
    renders: u64,
    _subscription: ColorSubscription,
}

impl PixelText {
    pub fn new(rasterizer: Rasterizer, request: RenderRequest) -> Self {
        let (dirty, subscription) = rasterizer.resolver().watch();
        Self {
            rasterizer,
            request,
            dirty,
            cached: None,
            renders: 0,
            _subscription: subscription,
        }
    }

    pub fn request(&self) -> &RenderRequest {
        &self.request
    }

    pub fn set_text(&mut self, text: &str) {
        if self.request.text != text {
            self.request.text = text.to_string();
            self.dirty.set(true);
        }
    }

    pub fn set_request(&mut self, request: RenderRequest) {
        if self.request != request {
            self.request = request;
            self.dirty.set(true);
        }
    }

    /// Returns the current raster, re-rendering if anything changed.
    pub fn frame(&mut self) -> &Raster {
        let dirty = self.dirty.replace(false);
        if dirty || self.cached.is_none() {
            let raster = self.rasterizer.render(&self.request);
            if self.cached.as_ref() != Some(&raster) {
                tracing::trace!(text = %self.request.text, color = %raster.color, "pixel text re-rendered");
            }
            self.renders += 1;
            self.cached = Some(raster);
        }
        self.cached
            .get_or_insert_with(|| self.rasterizer.render(&self.request))
    }

    /// Number of times the element actually rasterized.
    pub fn render_count(&self) -> u64 {
        self.renders
    }
}

impl std::fmt::Debug for PixelText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelText")
            .field("request", &self.request)
            .field("dirty", &self.dirty.get())
            .field("renders", &self.renders)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::{
        color::{ColorSlot, HighlightColor, Palette, Theme},
        glyph::GlyphTable,
        state::ThemeState,
    };

    fn rasterizer() -> Rasterizer {
        Rasterizer::new(ColorResolver::new(
            ThemeState::new(Theme::Dark),
            Palette::default(),
        ))
    }

    #[test]
    fn renders_letter_a_with_gap() {
        let raster = rasterizer().render(&RenderRequest::new("A").pixel_size(3));

        assert_eq!(raster.rects.len(), GlyphTable::lookup('A').lit_count());
        assert!(raster.rects.iter().all(|rect| rect.size == 2));
        assert_eq!((raster.width, raster.height), (18, 21));
    }

    #[test]
    fn pixel_set_matches_glyph_bits_for_every_character() {
        let rasterizer = rasterizer();
        for ch in GlyphTable::characters() {
            for pixel_size in 1..=4 {
                for bold in [false, true] {
                    let request = RenderRequest::new(ch.to_string())
                        .pixel_size(pixel_size)
                        .bold(bold);
                    let raster = rasterizer.render(&request);
                    let expected_size = if bold { pixel_size } else { pixel_size - 1 };

                    let expected: HashSet<PixelRect> = if expected_size == 0 {
                        HashSet::new()
                    } else {
                        GlyphTable::lookup(ch)
                            .cells()
                            .map(|(row, col)| PixelRect {
                                x: col as u32 * pixel_size,
                                y: row as u32 * pixel_size,
                                size: expected_size,
                            })
                            .collect()
                    };
                    let actual: HashSet<PixelRect> = raster.rects.iter().copied().collect();
                    assert_eq!(actual, expected, "{ch:?} at {pixel_size} bold={bold}");
                }
            }
        }
    }

    #[test]
    fn lowercase_is_uppercased_and_unknowns_are_blank() {
        let rasterizer = rasterizer();
        let lower = rasterizer.render(&RenderRequest::new("ab"));
        let upper = rasterizer.render(&RenderRequest::new("AB"));
        assert_eq!(lower, upper);

        let unknown = rasterizer.render(&RenderRequest::new("~?"));
        assert!(unknown.rects.is_empty());
        assert_eq!(unknown.width, 2 * CELL_ADVANCE * 3);
    }

    #[test]
    fn glyphs_advance_by_six_cells() {
        let raster = rasterizer().render(&RenderRequest::new("-- ").pixel_size(2).bold(true));
        let xs: Vec<u32> = raster.rects.iter().map(|rect| rect.x).collect();
        assert_eq!(xs, vec![0, 2, 4, 6, 8, 12, 14, 16, 18, 20]);
        assert_eq!(raster.width, 36);
    }

    #[test]
    fn oversized_requests_saturate_instead_of_overflowing() {
        let pixel_size = 100_000_000;
        let request = RenderRequest::new("AAAAAAAAAA").pixel_size(pixel_size);
        let raster = rasterizer().render(&request);

        assert_eq!(raster.rects.len(), 10 * GlyphTable::lookup('A').lit_count());
        assert_eq!(raster.width, u32::MAX);
        assert_eq!(raster.height, 7 * pixel_size);
        assert!(raster.rects.iter().all(|rect| rect.size == pixel_size - 1));
        assert!(raster.rects.iter().any(|rect| rect.x == u32::MAX));
        assert_eq!(
            raster.rects[0],
            PixelRect {
                x: pixel_size,
                y: 0,
                size: pixel_size - 1
            }
        );
    }

    #[test]
    fn image_export_paints_lit_cells() {
        let raster = rasterizer().render(
            &RenderRequest::new("I")
                .pixel_size(2)
                .bold(true)
                .color(Rgb(10, 20, 30)),
        );
        let image = raster.to_rgba_image();
        assert_eq!(image.dimensions(), (12, 14));
        assert_eq!(image.get_pixel(0, 0).0, [10, 20, 30, 255]);
        assert_eq!(image.get_pixel(0, 2).0, [0, 0, 0, 0]);
        assert_eq!(image.get_pixel(11, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn pixel_text_rerenders_on_external_highlight_change() {
        let rasterizer = rasterizer();
        let state = rasterizer.resolver().state().clone();
        let mut text = PixelText::new(
            rasterizer,
            RenderRequest::new("HI").color(ColorSlot::TextPrimary),
        );

        let first = text.frame().color;
        let _ = text.frame();
        assert_eq!(text.render_count(), 1);

        state.highlight.set(Some(HighlightColor::Orange));
        let second = text.frame().color;
        assert_eq!(text.render_count(), 2);
        assert_ne!(first, second);
        assert_eq!(second, HighlightColor::Orange.rgb());

        text.set_text("HI");
        let _ = text.frame();
        assert_eq!(text.render_count(), 2);

        text.set_text("HEY");
        assert_eq!(text.frame().width, 3 * CELL_ADVANCE * 3);
        assert_eq!(text.render_count(), 3);
    }
}
