//! Text surface drawn with embedded-graphics

use core::fmt::Debug;

use embedded_graphics::mono_font::{MonoFont, MonoTextStyle, ascii::FONT_6X10};
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};
use log::error;

use crate::display_manager::{SurfaceText, TextSurface};
use crate::framebuffer::FrameBuffer;

/// Full-panel label: text is centred along the top edge, one line per row.
///
/// Drawing goes to a [`FrameBuffer`] first and only the changed region is
/// flushed to the panel, so an unchanged reading costs no bus traffic.
pub struct LabelSurface<D>
where
    D: DrawTarget + OriginDimensions,
{
    display: D,
    frame: FrameBuffer<D::Color>,
    font: &'static MonoFont<'static>,
    foreground: D::Color,
    background: D::Color,
    text: SurfaceText,
}

impl<D> LabelSurface<D>
where
    D: DrawTarget + OriginDimensions,
    D::Error: Debug,
{
    /// Wrap a panel that currently shows `background` everywhere.
    pub fn new(display: D, foreground: D::Color, background: D::Color) -> Self {
        let frame = FrameBuffer::new(display.size(), background);
        Self {
            display,
            frame,
            font: &FONT_6X10,
            foreground,
            background,
            text: SurfaceText::new(),
        }
    }

    /// Get the current text content.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    fn redraw(&mut self) {
        // Drawing into the framebuffer cannot fail
        let _ = self.frame.clear(self.background);

        let character_style = MonoTextStyle::new(self.font, self.foreground);
        let text_style = TextStyleBuilder::new()
            .alignment(Alignment::Center)
            .baseline(Baseline::Top)
            .build();
        let position = Point::new(self.frame.size().width as i32 / 2, 0);
        let _ = Text::with_text_style(&self.text, position, character_style, text_style)
            .draw(&mut self.frame);

        if let Err(e) = self.frame.flush(&mut self.display) {
            error!("Failed to flush surface to display: {:?}", e);
        }
    }
}

impl<D> TextSurface for LabelSurface<D>
where
    D: DrawTarget + OriginDimensions,
    D::Error: Debug,
{
    fn set_text(&mut self, text: &str) {
        if self.text.as_str() == text {
            return;
        }
        self.text.clear();
        // Longer text is cut at the surface capacity
        for ch in text.chars() {
            if self.text.push(ch).is_err() {
                break;
            }
        }
        self.redraw();
    }
}
