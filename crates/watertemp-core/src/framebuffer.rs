//! In-RAM copy of one panel that remembers which pixels changed.
//!
//! A surface redraws its whole label here and then pushes only the box
//! around the changed pixels to the real panel.

extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;
use core::convert::Infallible;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PointsIter, Rectangle};
use log::debug;

/// Half-open pixel bounds (`x0..x1`, `y0..y1`) of unflushed changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Changed {
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
}

impl Changed {
    fn at(x: usize, y: usize) -> Self {
        Self {
            x0: x,
            y0: y,
            x1: x + 1,
            y1: y + 1,
        }
    }

    fn include(&mut self, x: usize, y: usize) {
        self.x0 = self.x0.min(x);
        self.y0 = self.y0.min(y);
        self.x1 = self.x1.max(x + 1);
        self.y1 = self.y1.max(y + 1);
    }

    fn area(&self) -> Rectangle {
        Rectangle::new(
            Point::new(self.x0 as i32, self.y0 as i32),
            Size::new((self.x1 - self.x0) as u32, (self.y1 - self.y0) as u32),
        )
    }
}

/// Row-major pixel store the size of one panel.
pub struct FrameBuffer<C: PixelColor> {
    width: usize,
    height: usize,
    pixels: Vec<C>,
    changed: Option<Changed>,
}

impl<C: PixelColor> FrameBuffer<C> {
    /// Allocate a framebuffer of `size` filled with `background`.
    ///
    /// Starts clean: the panel is assumed to show `background` already.
    pub fn new(size: Size, background: C) -> Self {
        let width = size.width as usize;
        let height = size.height as usize;
        Self {
            width,
            height,
            pixels: vec![background; width * height],
            changed: None,
        }
    }

    /// Color at a coordinate, or `None` outside the buffer.
    pub fn pixel(&self, x: usize, y: usize) -> Option<C> {
        if x < self.width && y < self.height {
            Some(self.pixels[y * self.width + x])
        } else {
            None
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.changed.is_some()
    }

    /// Store one in-bounds pixel. Writing the color already there is not a change.
    #[inline]
    fn store(&mut self, x: usize, y: usize, color: C) {
        let cell = &mut self.pixels[y * self.width + x];
        if *cell == color {
            return;
        }
        *cell = color;
        self.changed = Some(match self.changed {
            Some(mut changed) => {
                changed.include(x, y);
                changed
            }
            None => Changed::at(x, y),
        });
    }

    /// Store a pixel given in signed panel coordinates, dropping it if it is off-panel.
    fn store_signed(&mut self, point: Point, color: C) {
        let (Ok(x), Ok(y)) = (usize::try_from(point.x), usize::try_from(point.y)) else {
            return;
        };
        if x < self.width && y < self.height {
            self.store(x, y, color);
        }
    }

    /// Clamp a rectangle to the buffer, as half-open pixel ranges.
    fn clamp(&self, area: &Rectangle) -> (core::ops::Range<usize>, core::ops::Range<usize>) {
        let clamp_axis = |start: i32, len: u32, max: usize| {
            let from = start.max(0) as usize;
            let to = (start as i64 + len as i64).clamp(0, max as i64) as usize;
            from.min(max)..to
        };
        (
            clamp_axis(area.top_left.x, area.size.width, self.width),
            clamp_axis(area.top_left.y, area.size.height, self.height),
        )
    }

    /// Send the changed box to `display` in one `fill_contiguous` call and
    /// mark the buffer clean. Does nothing when no pixel changed.
    pub fn flush<D>(&mut self, display: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = C>,
    {
        let Some(changed) = self.changed.take() else {
            return Ok(());
        };

        let area = changed.area();
        debug!(
            "Flushing {}x{} region at ({}, {})",
            area.size.width, area.size.height, changed.x0, changed.y0
        );

        let colors = self
            .pixels
            .chunks_exact(self.width)
            .skip(changed.y0)
            .take(changed.y1 - changed.y0)
            .flat_map(|row| row[changed.x0..changed.x1].iter().copied());

        display.fill_contiguous(&area, colors)
    }
}

impl<C: PixelColor> OriginDimensions for FrameBuffer<C> {
    fn size(&self) -> Size {
        Size::new(self.width as u32, self.height as u32)
    }
}

impl<C: PixelColor> DrawTarget for FrameBuffer<C> {
    type Color = C;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.store_signed(point, color);
        }
        Ok(())
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        // Colors run row-major over the unclamped area
        for (point, color) in area.points().zip(colors) {
            self.store_signed(point, color);
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let (xs, ys) = self.clamp(area);
        for y in ys {
            for x in xs.clone() {
                self.store(x, y, color);
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        for y in 0..self.height {
            for x in 0..self.width {
                self.store(x, y, color);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::Drawable;
    use embedded_graphics::pixelcolor::BinaryColor;
    use embedded_graphics::primitives::{Primitive, PrimitiveStyle, Rectangle};

    #[test]
    fn test_new_buffer_is_clean() {
        let fb = FrameBuffer::new(Size::new(16, 8), BinaryColor::Off);
        assert!(!fb.is_dirty());
        assert_eq!(fb.pixel(15, 7), Some(BinaryColor::Off));
        assert_eq!(fb.pixel(16, 0), None);
    }

    #[test]
    fn test_unchanged_pixels_do_not_dirty() {
        let mut fb = FrameBuffer::new(Size::new(16, 8), BinaryColor::Off);
        fb.clear(BinaryColor::Off).unwrap();
        assert!(!fb.is_dirty());

        Pixel(Point::new(3, 2), BinaryColor::On).draw(&mut fb).unwrap();
        assert!(fb.is_dirty());
    }

    #[test]
    fn test_flush_copies_only_dirty_region() {
        let mut fb = FrameBuffer::new(Size::new(16, 8), BinaryColor::Off);
        let mut panel = FrameBuffer::new(Size::new(16, 8), BinaryColor::Off);

        Rectangle::new(Point::new(2, 1), Size::new(3, 2))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut fb)
            .unwrap();
        fb.flush(&mut panel).unwrap();

        assert!(!fb.is_dirty());
        assert_eq!(panel.pixel(2, 1), Some(BinaryColor::On));
        assert_eq!(panel.pixel(4, 2), Some(BinaryColor::On));
        assert_eq!(panel.pixel(5, 2), Some(BinaryColor::Off));
        assert_eq!(panel.pixel(0, 0), Some(BinaryColor::Off));
    }

    #[test]
    fn test_flush_covers_box_around_separate_changes() {
        let mut fb = FrameBuffer::new(Size::new(16, 8), BinaryColor::Off);
        let mut panel = FrameBuffer::new(Size::new(16, 8), BinaryColor::On);

        Pixel(Point::new(1, 1), BinaryColor::On).draw(&mut fb).unwrap();
        Pixel(Point::new(5, 3), BinaryColor::On).draw(&mut fb).unwrap();
        fb.flush(&mut panel).unwrap();

        // Unchanged pixels inside the box are sent too, outside it nothing is
        assert_eq!(panel.pixel(3, 2), Some(BinaryColor::Off));
        assert_eq!(panel.pixel(1, 1), Some(BinaryColor::On));
        assert_eq!(panel.pixel(5, 3), Some(BinaryColor::On));
        assert_eq!(panel.pixel(0, 0), Some(BinaryColor::On));
        assert_eq!(panel.pixel(6, 3), Some(BinaryColor::On));
        assert_eq!(panel.pixel(5, 4), Some(BinaryColor::On));
    }

    #[test]
    fn test_fill_solid_clamps_negative_origin() {
        let mut fb = FrameBuffer::new(Size::new(8, 8), BinaryColor::Off);
        fb.fill_solid(
            &Rectangle::new(Point::new(-4, -4), Size::new(6, 6)),
            BinaryColor::On,
        )
        .unwrap();

        assert_eq!(fb.pixel(0, 0), Some(BinaryColor::On));
        assert_eq!(fb.pixel(1, 1), Some(BinaryColor::On));
        assert_eq!(fb.pixel(2, 2), Some(BinaryColor::Off));
    }
}
