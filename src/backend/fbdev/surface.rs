use crate::{
    backend::renderer::{Canvas, Color},
    utils::{Physical, Point, Rectangle},
};

use super::{Channel, PixelLayout};

/// A pixel addressable view of a framebuffer's memory
///
/// Points are expressed in the coordinate space of [`PixelSurface::bounds`]: the visible
/// window starts at the viewport offset of the mode, not at the origin. Channels are
/// read and written one byte each at the offsets described by the [`PixelLayout`], so
/// any RGB ordering inside the 32-bit pixel is supported.
///
/// `B` is the backing store, usually an [`FbMapping`](super::FbMapping) but any byte
/// buffer works. Reading only requires `B: AsRef<[u8]>`, writing additionally requires
/// `B: AsMut<[u8]>`.
#[derive(Debug)]
pub struct PixelSurface<B> {
    buffer: B,
    layout: PixelLayout,
}

impl<B: AsRef<[u8]>> PixelSurface<B> {
    /// Wrap a backing store described by `layout`
    pub fn new(buffer: B, layout: PixelLayout) -> Self {
        PixelSurface { buffer, layout }
    }

    /// The layout this surface addresses pixels with
    pub fn layout(&self) -> &PixelLayout {
        &self.layout
    }

    /// Give back the backing store
    pub fn into_inner(self) -> B {
        self.buffer
    }

    /// Byte offset of a channel of the pixel at `point`.
    ///
    /// Returns `None` if `point` is not inside the visible window or the resulting
    /// byte would be outside of the backing store.
    pub fn byte_offset(&self, point: Point<Physical>, channel: Channel) -> Option<usize> {
        byte_offset(&self.layout, self.buffer.as_ref().len(), point, channel)
    }

    /// Read a pixel, `None` if it is outside of the visible window
    pub fn pixel(&self, point: Point<Physical>) -> Option<Color> {
        let bytes = self.buffer.as_ref();
        let [r, g, b] = [Channel::Red, Channel::Green, Channel::Blue]
            .map(|channel| self.byte_offset(point, channel).map(|offset| bytes[offset]));
        Some(Color::rgb(r?, g?, b?))
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> PixelSurface<B> {
    /// Write a pixel, returns whether it was inside the visible window
    pub fn put_pixel(&mut self, point: Point<Physical>, color: Color) -> bool {
        let offsets = [Channel::Red, Channel::Green, Channel::Blue].map(|channel| self.byte_offset(point, channel));
        let [Some(r), Some(g), Some(b)] = offsets else {
            return false;
        };
        let bytes = self.buffer.as_mut();
        bytes[r] = color.r();
        bytes[g] = color.g();
        bytes[b] = color.b();
        true
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> Canvas for PixelSurface<B> {
    fn bounds(&self) -> Rectangle<Physical> {
        self.layout.visible()
    }

    fn get(&self, point: Point<Physical>) -> Color {
        self.pixel(point).unwrap_or(Color::TRANSPARENT)
    }

    fn set(&mut self, point: Point<Physical>, color: Color) {
        self.put_pixel(point, color);
    }
}

/// Address of one channel byte.
///
/// The visible window is offset into the virtual canvas, so a point `p` of the window
/// lives at `stride * p.y + 4 * p.x`. Every check happens before any memory access.
fn byte_offset(layout: &PixelLayout, len: usize, point: Point<Physical>, channel: Channel) -> Option<usize> {
    if !layout.visible().contains(point) {
        return None;
    }
    // contained in a rectangle with a non-negative origin, so both are positive
    let x = usize::try_from(point.x).ok()?;
    let y = usize::try_from(point.y).ok()?;
    let offset = layout
        .stride()
        .checked_mul(y)?
        .checked_add(x.checked_mul(PixelLayout::BYTES_PER_PIXEL)?)?
        .checked_add(layout.channel_offset(channel))?;
    (offset < len).then_some(offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fbdev::info::tests::{fixed, variable};

    fn surface(rgb_offsets: [u32; 3]) -> PixelSurface<Vec<u8>> {
        let layout = PixelLayout::new(&fixed(64 * 48, 64), &variable(16, 48, rgb_offsets)).unwrap();
        PixelSurface::new(vec![0; layout.memory_length()], layout)
    }

    #[test]
    fn set_get_every_channel_order() {
        let orders = [
            [0, 8, 16],
            [16, 8, 0],
            [8, 16, 24],
            [24, 16, 8],
            [0, 16, 8],
            [8, 0, 16],
        ];
        let color = Color::new(0x12, 0x34, 0x56, 0x00);
        for order in orders {
            let mut surface = surface(order);
            for (x, y) in [(0, 0), (15, 0), (0, 47), (15, 47), (7, 23)] {
                surface.set(Point::new(x, y), color);
                assert_eq!(surface.get(Point::new(x, y)), Color::rgb(0x12, 0x34, 0x56), "{:?}", order);
            }
        }
    }

    #[test]
    fn channel_bytes_land_at_their_offsets() {
        let mut surface = surface([16, 8, 0]);
        surface.set(Point::new(1, 2), Color::rgb(1, 2, 3));
        let bytes = surface.into_inner();
        let pixel = 64 * 2 + 4;
        assert_eq!(&bytes[pixel..pixel + 4], &[3, 2, 1, 0]);
    }

    #[test]
    fn out_of_bounds_is_clipped() {
        let mut surface = surface([16, 8, 0]);
        for (x, y) in [(-1, 0), (0, -1), (16, 0), (0, 48), (i32::MIN, i32::MAX), (i32::MAX, 3)] {
            surface.set(Point::new(x, y), Color::WHITE);
            assert_eq!(surface.get(Point::new(x, y)), Color::TRANSPARENT);
        }
        assert!(surface.into_inner().iter().all(|&b| b == 0));
    }

    #[test]
    fn viewport_offset_shifts_addressing() {
        let mut var = variable(8, 8, [16, 8, 0]);
        var.xoffset = 4;
        var.yoffset = 8;
        var.yres_virtual = 16;
        let layout = PixelLayout::new(&fixed(64 * 16, 64), &var).unwrap();
        let mut surface = PixelSurface::new(vec![0u8; layout.memory_length()], layout);

        assert_eq!(surface.bounds(), Rectangle::from_loc_and_size((4, 8), (8, 8)));
        assert!(!surface.put_pixel(Point::new(0, 0), Color::WHITE));
        assert!(surface.put_pixel(Point::new(4, 8), Color::rgb(9, 9, 9)));
        assert_eq!(surface.byte_offset(Point::new(4, 8), Channel::Blue), Some(64 * 8 + 4 * 4));
        assert_eq!(surface.into_inner()[64 * 8 + 16], 9);
    }

    #[test]
    fn short_buffer_never_indexed_out_of_range() {
        let layout = PixelLayout::new(&fixed(64 * 48, 64), &variable(16, 48, [16, 8, 0])).unwrap();
        let mut surface = PixelSurface::new(vec![0u8; 64], layout);
        surface.set(Point::new(15, 47), Color::WHITE);
        assert_eq!(surface.get(Point::new(15, 47)), Color::TRANSPARENT);
        assert_eq!(surface.get(Point::new(1, 0)), Color::BLACK);
    }

    #[test]
    fn fill_covers_only_the_window() {
        let layout = PixelLayout::new(&fixed(64 * 4, 64), &variable(8, 4, [16, 8, 0])).unwrap();
        let mut surface = PixelSurface::new(vec![0u8; layout.memory_length()], layout);
        surface.fill(Color::WHITE);
        let bytes = surface.into_inner();
        for row in bytes.chunks(64) {
            // 8 pixels of 3 color bytes, padding and the X byte stay untouched
            assert_eq!(row.iter().filter(|&&b| b == 255).count(), 24);
            assert!(row[32..].iter().all(|&b| b == 0));
        }
    }
}
