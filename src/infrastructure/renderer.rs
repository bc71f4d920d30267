// Frame rendering for the e-paper panel
use std::convert::Infallible;

use embedded_graphics::{
    mono_font::{
        MonoTextStyle,
        ascii::{FONT_6X10, FONT_10X20},
    },
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Line, PrimitiveStyle, Rectangle},
    text::{Baseline, Text},
};
use thiserror::Error;

use crate::domain::reading::PowerPoint;
use crate::domain::view::{SourceRow, ViewModel};

/// 1-bit framebuffer, rows packed MSB-first with bit 1 = black ink. The
/// packing matches PBM (P4) so a frame can be spooled without conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32) -> Self {
        let stride = width.div_ceil(8) as usize;
        Self {
            width,
            height,
            data: vec![0; stride * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn stride(&self) -> usize {
        self.width.div_ceil(8) as usize
    }

    pub fn set(&mut self, x: u32, y: u32, on: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        let byte = y as usize * self.stride() + (x / 8) as usize;
        let mask: u8 = 0x80 >> (x % 8);
        if on {
            self.data[byte] |= mask;
        } else {
            self.data[byte] &= !mask;
        }
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let byte = y as usize * self.stride() + (x / 8) as usize;
        self.data[byte] & (0x80u8 >> (x % 8)) != 0
    }

    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|b| *b == 0)
    }

    /// Serializes as binary PBM, the format handed to the display push.
    pub fn to_pbm(&self) -> Vec<u8> {
        let mut out = format!("P4\n{} {}\n", self.width, self.height).into_bytes();
        out.extend_from_slice(&self.data);
        out
    }

    /// Copies `src` onto this frame enlarged by an integer factor. Set
    /// pixels only; the destination background shows through blanks.
    pub fn blit_scaled(&mut self, src: &Frame, top_left: Point, scale: u32) {
        let scale = scale.max(1);
        for y in 0..src.height {
            for x in 0..src.width {
                if !src.get(x, y) {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        let px = top_left.x + (x * scale + dx) as i32;
                        let py = top_left.y + (y * scale + dy) as i32;
                        if px >= 0 && py >= 0 {
                            self.set(px as u32, py as u32, true);
                        }
                    }
                }
            }
        }
    }
}

impl OriginDimensions for Frame {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for Frame {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x >= 0 && point.y >= 0 {
                self.set(point.x as u32, point.y as u32, color.is_on());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid display geometry {0}x{1}")]
    InvalidGeometry(u32, u32),
}

const MARGIN: i32 = 40;

/// Draws a view model into a fresh frame. Stateless apart from the panel
/// geometry, which is validated once at startup; rendering itself cannot
/// fail.
#[derive(Debug, Clone)]
pub struct Renderer {
    width: u32,
    height: u32,
}

impl Renderer {
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidGeometry(width, height));
        }
        Ok(Self { width, height })
    }

    pub fn render(&self, view: &ViewModel) -> Frame {
        match self.paint(view) {
            Ok(frame) => frame,
            Err(e) => match e {},
        }
    }

    fn paint(&self, view: &ViewModel) -> Result<Frame, Infallible> {
        let mut frame = Frame::new(self.width, self.height);
        match view {
            ViewModel::WaitingForData => self.paint_waiting(&mut frame)?,
            ViewModel::AllSources {
                rows,
                captured_at,
                stale,
            } => self.paint_overview(&mut frame, rows, captured_at, *stale)?,
            ViewModel::SingleSource {
                label,
                watts,
                history,
                position,
                total,
                captured_at,
                stale,
            } => self.paint_single(
                &mut frame,
                label,
                *watts,
                history,
                *position,
                *total,
                captured_at,
                *stale,
            )?,
        }
        Ok(frame)
    }

    fn paint_waiting(&self, frame: &mut Frame) -> Result<(), Infallible> {
        let scale = 3;
        let y = self.height as i32 / 2 - 10 * scale;
        draw_text_scaled(frame, "WAITING FOR DATA", self.center_x(16, scale as u32), y, scale as u32);

        let small = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
        let hint = "no readings received from the monitor yet";
        Text::with_baseline(
            hint,
            Point::new(self.center_x_small(hint.len()), y + 20 * scale + 20),
            small,
            Baseline::Top,
        )
        .draw(frame)?;
        Ok(())
    }

    fn paint_overview(
        &self,
        frame: &mut Frame,
        rows: &[SourceRow],
        captured_at: &chrono::DateTime<chrono::Utc>,
        stale: bool,
    ) -> Result<(), Infallible> {
        draw_text_scaled(frame, "POWER CONSUMPTION", self.center_x(17, 2), MARGIN, 2);
        self.paint_footer(frame, captured_at, stale)?;

        let big = MonoTextStyle::new(&FONT_10X20, BinaryColor::On);
        let bar_style = PrimitiveStyle::with_fill(BinaryColor::On);
        let max_watts = rows.iter().map(|r| r.watts.abs()).fold(1.0_f64, f64::max);
        let bar_span = (self.width as i32 - 2 * MARGIN).max(1);

        let mut y = MARGIN + 70;
        for row in rows {
            Text::with_baseline(&row.label, Point::new(MARGIN, y), big, Baseline::Top).draw(frame)?;

            let value = format_watts(row.watts);
            let x_right = self.width as i32 - MARGIN - value.len() as i32 * 10;
            Text::with_baseline(&value, Point::new(x_right, y), big, Baseline::Top).draw(frame)?;

            let bar = (row.watts.abs() / max_watts * bar_span as f64) as i32;
            if bar > 0 {
                Rectangle::new(
                    Point::new(MARGIN, y + 24),
                    Size::new(bar as u32, 8),
                )
                .into_styled(bar_style)
                .draw(frame)?;
            }
            y += 48;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn paint_single(
        &self,
        frame: &mut Frame,
        label: &str,
        watts: f64,
        history: &[PowerPoint],
        position: usize,
        total: usize,
        captured_at: &chrono::DateTime<chrono::Utc>,
        stale: bool,
    ) -> Result<(), Infallible> {
        draw_text_scaled(frame, label, self.center_x(label.len(), 3), MARGIN, 3);

        let value = format_watts(watts);
        draw_text_scaled(frame, &value, self.center_x(value.len(), 5), MARGIN + 90, 5);

        let small = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
        let context = format!("source {position} of {total}");
        Text::with_baseline(
            &context,
            Point::new(self.center_x_small(context.len()), MARGIN + 210),
            small,
            Baseline::Top,
        )
        .draw(frame)?;

        let top = MARGIN + 250;
        let bottom = self.height as i32 - MARGIN - 60;
        if bottom > top + 20 {
            let area = Rectangle::new(
                Point::new(MARGIN, top),
                Size::new(
                    (self.width as i32 - 2 * MARGIN).max(1) as u32,
                    (bottom - top) as u32,
                ),
            );
            draw_sparkline(frame, history, area)?;
        }

        self.paint_footer(frame, captured_at, stale)?;
        Ok(())
    }

    fn paint_footer(
        &self,
        frame: &mut Frame,
        captured_at: &chrono::DateTime<chrono::Utc>,
        stale: bool,
    ) -> Result<(), Infallible> {
        let small = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
        let mut line = format!("updated {} UTC", captured_at.format("%Y-%m-%d %H:%M"));
        if stale {
            line.push_str("  [STALE]");
        }
        Text::with_baseline(
            &line,
            Point::new(MARGIN, self.height as i32 - MARGIN),
            small,
            Baseline::Top,
        )
        .draw(frame)?;
        Ok(())
    }

    /// X origin that centers `chars` characters of FONT_10X20 at `scale`.
    fn center_x(&self, chars: usize, scale: u32) -> i32 {
        let text_w = chars as i32 * 10 * scale as i32;
        ((self.width as i32 - text_w) / 2).max(0)
    }

    fn center_x_small(&self, chars: usize) -> i32 {
        let text_w = chars as i32 * 6;
        ((self.width as i32 - text_w) / 2).max(0)
    }
}

fn format_watts(watts: f64) -> String {
    format!("{watts:.0} W")
}

/// Draws FONT_10X20 text enlarged by an integer factor by rendering at 1x
/// into a scratch frame and blitting it up.
fn draw_text_scaled(frame: &mut Frame, text: &str, x: i32, y: i32, scale: u32) {
    let chars = text.len().max(1) as u32;
    let mut scratch = Frame::new(chars * 10, 20);
    let style = MonoTextStyle::new(&FONT_10X20, BinaryColor::On);
    let drawn: Result<Point, Infallible> =
        Text::with_baseline(text, Point::zero(), style, Baseline::Top).draw(&mut scratch);
    match drawn {
        Ok(_) => frame.blit_scaled(&scratch, Point::new(x, y), scale),
        Err(e) => match e {},
    }
}

/// Polyline of the rolling history inside `area`, with plain x/y axes.
/// Linear y scale between the window's own min and max.
fn draw_sparkline(
    frame: &mut Frame,
    history: &[PowerPoint],
    area: Rectangle,
) -> Result<(), Infallible> {
    let axis = PrimitiveStyle::with_stroke(BinaryColor::On, 2);
    let left = area.top_left.x;
    let top = area.top_left.y;
    let right = left + area.size.width as i32 - 1;
    let bottom = top + area.size.height as i32 - 1;

    Line::new(Point::new(left, top), Point::new(left, bottom))
        .into_styled(axis)
        .draw(frame)?;
    Line::new(Point::new(left, bottom), Point::new(right, bottom))
        .into_styled(axis)
        .draw(frame)?;

    if history.len() < 2 {
        return Ok(());
    }

    let t0 = history[0].epoch_secs;
    let t1 = history[history.len() - 1].epoch_secs;
    let t_span = (t1 - t0).max(1) as f64;

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for p in history {
        min = min.min(p.watts);
        max = max.max(p.watts);
    }
    if (max - min).abs() < f64::EPSILON {
        min -= 1.0;
        max += 1.0;
    }

    let plot = |p: &PowerPoint| {
        let fx = (p.epoch_secs - t0) as f64 / t_span;
        let fy = (p.watts - min) / (max - min);
        Point::new(
            left + (fx * (area.size.width as f64 - 1.0)) as i32,
            bottom - (fy * (area.size.height as f64 - 1.0)) as i32,
        )
    };

    let stroke = PrimitiveStyle::with_stroke(BinaryColor::On, 2);
    for pair in history.windows(2) {
        Line::new(plot(&pair[0]), plot(&pair[1]))
            .into_styled(stroke)
            .draw(frame)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn overview() -> ViewModel {
        ViewModel::AllSources {
            rows: vec![
                SourceRow {
                    label: "Main".into(),
                    watts: 1250.0,
                },
                SourceRow {
                    label: "Solar".into(),
                    watts: -430.0,
                },
            ],
            captured_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            stale: false,
        }
    }

    #[test]
    fn zero_geometry_is_a_configuration_error() {
        assert!(matches!(
            Renderer::new(0, 1448),
            Err(RenderError::InvalidGeometry(0, 1448))
        ));
    }

    #[test]
    fn rendering_is_deterministic() {
        let renderer = Renderer::new(400, 300).unwrap();
        let view = overview();
        assert_eq!(renderer.render(&view), renderer.render(&view));
    }

    #[test]
    fn every_view_puts_ink_on_the_frame() {
        let renderer = Renderer::new(400, 300).unwrap();
        let views = [
            ViewModel::WaitingForData,
            overview(),
            ViewModel::SingleSource {
                label: "Main".into(),
                watts: 1250.0,
                history: vec![
                    PowerPoint::new(1714560000, 1100.0),
                    PowerPoint::new(1714563600, 1250.0),
                ],
                position: 1,
                total: 2,
                captured_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
                stale: false,
            },
        ];
        for view in &views {
            assert!(!renderer.render(view).is_blank(), "blank frame for {view:?}");
        }
    }

    #[test]
    fn waiting_and_overview_render_differently() {
        let renderer = Renderer::new(400, 300).unwrap();
        assert_ne!(
            renderer.render(&ViewModel::WaitingForData),
            renderer.render(&overview())
        );
    }

    #[test]
    fn frame_packs_rows_msb_first() {
        let mut frame = Frame::new(10, 2);
        frame.set(0, 0, true);
        frame.set(9, 1, true);
        assert!(frame.get(0, 0));
        assert!(frame.get(9, 1));
        assert!(!frame.get(5, 0));
        // 10 px wide -> 2 bytes per row.
        let pbm = frame.to_pbm();
        assert!(pbm.starts_with(b"P4\n10 2\n"));
        assert_eq!(pbm.len(), 8 + 4);
        assert_eq!(pbm[8], 0x80);
        assert_eq!(pbm[11], 0x40);
    }

    #[test]
    fn out_of_bounds_draws_are_clipped() {
        let mut frame = Frame::new(8, 8);
        frame.set(100, 100, true);
        assert!(frame.is_blank());
    }

    #[test]
    fn blit_scaled_doubles_each_pixel() {
        let mut src = Frame::new(2, 1);
        src.set(1, 0, true);
        let mut dst = Frame::new(8, 8);
        dst.blit_scaled(&src, Point::new(0, 0), 2);
        assert!(dst.get(2, 0) && dst.get(3, 0) && dst.get(2, 1) && dst.get(3, 1));
        assert!(!dst.get(0, 0) && !dst.get(4, 0));
    }
}
