//! Incremental rendering of touch contacts
//!
//! A [`MarkerRenderer`] draws one square marker per active contact and only touches the
//! pixels of contacts that changed since the previous frame.

use crate::{
    input::touch::{Contact, RenderFrame},
    utils::{Physical, Point, Rectangle},
};

use super::{Canvas, Color};

/// Shape of a contact marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerShape {
    /// One pixel wide square outline
    Outline,
    /// Solid square block
    Filled,
}

/// How contacts are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerStyle {
    /// Shape of the marker
    pub shape: MarkerShape,
    /// Distance from the contact to the marker's edge, in pixels
    pub radius: i32,
    /// Whether the previous marker is erased when a contact moves or lifts.
    ///
    /// Without erasing, contacts leave trails.
    pub erase: bool,
    /// Color markers are drawn with
    pub foreground: Color,
    /// Color markers are erased with
    pub background: Color,
}

impl MarkerStyle {
    /// Hollow square following each contact
    pub const fn outline() -> MarkerStyle {
        MarkerStyle {
            shape: MarkerShape::Outline,
            radius: 35,
            erase: true,
            foreground: Color::WHITE,
            background: Color::BLACK,
        }
    }

    /// Hollow squares that are never erased
    pub const fn ghost() -> MarkerStyle {
        MarkerStyle {
            erase: false,
            ..MarkerStyle::outline()
        }
    }

    /// Small blocks that are never erased, drawing the path of every contact
    pub const fn dots() -> MarkerStyle {
        MarkerStyle {
            shape: MarkerShape::Filled,
            radius: 1,
            erase: false,
            ..MarkerStyle::outline()
        }
    }

    /// Pixels covered by a marker centered on `center`
    pub fn footprint(&self, center: Point<Physical>) -> Rectangle<Physical> {
        Rectangle::centered(center, self.radius)
    }

    fn paint(&self, canvas: &mut impl Canvas, center: Point<Physical>, color: Color) {
        let rect = self.footprint(center);
        match self.shape {
            MarkerShape::Outline => canvas.stroke_rect(rect, color),
            MarkerShape::Filled => canvas.fill_rect(rect, color),
        }
    }
}

impl Default for MarkerStyle {
    fn default() -> Self {
        MarkerStyle::outline()
    }
}

/// Draws the delta between two committed touch frames
#[derive(Debug)]
pub struct MarkerRenderer {
    style: MarkerStyle,
    erased: Vec<Rectangle<Physical>>,
}

impl MarkerRenderer {
    /// Create a renderer drawing with `style`
    pub fn new(style: MarkerStyle) -> MarkerRenderer {
        MarkerRenderer {
            style,
            erased: Vec::new(),
        }
    }

    /// The style markers are drawn with
    pub fn style(&self) -> &MarkerStyle {
        &self.style
    }

    /// Render one frame.
    ///
    /// Every slot whose contact changed gets its previous marker erased (if the style
    /// erases and the contact was active) and its current marker drawn (if active). All
    /// erasing happens before any drawing, and unchanged markers overlapping an erased one
    /// are drawn again so they are not left with holes.
    #[profiling::function]
    pub fn render(&mut self, frame: &RenderFrame<'_>, canvas: &mut impl Canvas) {
        let style = self.style;
        self.erased.clear();

        if style.erase {
            for (_, previous, _) in frame.changed() {
                if previous.active {
                    style.paint(canvas, previous.position, style.background);
                    self.erased.push(style.footprint(previous.position));
                }
            }
        }

        for (previous, current) in frame.previous.iter().zip(frame.current) {
            if !current.active {
                continue;
            }
            if previous != current || self.damaged(current) {
                style.paint(canvas, current.position, style.foreground);
            }
        }
    }

    fn damaged(&self, contact: &Contact) -> bool {
        let footprint = self.style.footprint(contact.position);
        self.erased.iter().any(|erased| erased.overlaps(footprint))
    }
}

impl Default for MarkerRenderer {
    fn default() -> Self {
        MarkerRenderer::new(MarkerStyle::default())
    }
}
