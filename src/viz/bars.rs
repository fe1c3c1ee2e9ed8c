//! Mirrored bar-column widget for the wave display.
//!
//! Paints each `(x, half_height)` sample as a column reflected around the
//! vertical midline. Fractional heights use eighth-block characters; the
//! lower half draws the complement with foreground and background swapped,
//! so partial cells fill from the top.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

use crate::signal::BarSample;

const WAVE_COLOR: Color = Color::Rgb(46, 209, 132);
const PLAYED_COLOR: Color = Color::Rgb(185, 207, 212);
const CURSOR_COLOR: Color = Color::Rgb(255, 255, 255);
const BACKGROUND: Color = Color::Rgb(0, 0, 0);

const EIGHTHS: [&str; 8] = ["▁", "▂", "▃", "▄", "▅", "▆", "▇", "█"];

/// One frame of the wave, with the seek overlay.
pub struct WaveBars<'a> {
    frame: &'a [BarSample],
    bar_width: u16,
    progress: u8,
    show_cursor: bool,
}

impl<'a> WaveBars<'a> {
    pub fn new(frame: &'a [BarSample]) -> Self {
        Self {
            frame,
            bar_width: 1,
            progress: 0,
            show_cursor: false,
        }
    }

    pub fn bar_width(mut self, bar_width: u16) -> Self {
        self.bar_width = bar_width.max(1);
        self
    }

    /// Seek position, 0-100. Bars left of it use the played color.
    pub fn progress(mut self, progress: u8) -> Self {
        self.progress = progress.min(100);
        self
    }

    pub fn show_cursor(mut self, show_cursor: bool) -> Self {
        self.show_cursor = show_cursor;
        self
    }
}

impl Widget for WaveBars<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height < 2 {
            return;
        }

        let background = Style::default().bg(BACKGROUND);
        for y in area.top()..area.bottom() {
            for x in area.left()..area.right() {
                buf.set_string(x, y, " ", background);
            }
        }

        let progress_col = area.left() + progress_column(area.width, self.progress);

        for bar in self.frame {
            let x0 = area.left() as u32 + bar.x.round().max(0.0) as u32;
            for col in x0..x0 + u32::from(self.bar_width) {
                if col >= u32::from(area.right()) {
                    break;
                }
                let col = col as u16;
                let color = if col < progress_col {
                    PLAYED_COLOR
                } else {
                    WAVE_COLOR
                };
                paint_column(buf, area, col, bar.half_height, color);
            }
        }

        if self.show_cursor {
            let cursor_col = progress_col.min(area.right().saturating_sub(1));
            let cursor = Style::default().fg(CURSOR_COLOR).bg(BACKGROUND);
            for y in area.top()..area.bottom() {
                buf.set_string(cursor_col, y, "│", cursor);
            }
        }
    }
}

/// Paints one mirrored column: `half` rows above and below the midline,
/// with an eighth-block edge cell on either side for the fraction.
fn paint_column(buf: &mut Buffer, area: Rect, col: u16, half: f32, color: Color) {
    let top = i32::from(area.top());
    let bottom = i32::from(area.bottom());
    let mid = top + i32::from(area.height / 2);

    let max_half = f32::from(area.height) / 2.0;
    let (full, eighths) = split_eighths(half.min(max_half));

    let style = Style::default().fg(color).bg(BACKGROUND);

    for k in 0..i32::from(full) {
        let up = mid - 1 - k;
        let down = mid + k;
        if up >= top {
            buf.set_string(col, up as u16, EIGHTHS[7], style);
        }
        if down < bottom {
            buf.set_string(col, down as u16, EIGHTHS[7], style);
        }
    }

    if eighths > 0 {
        let up = mid - 1 - i32::from(full);
        let down = mid + i32::from(full);
        if up >= top {
            buf.set_string(col, up as u16, EIGHTHS[usize::from(eighths) - 1], style);
        }
        if down < bottom {
            // Complement block with fg/bg swapped: fills from the top.
            let inverted = Style::default().fg(BACKGROUND).bg(color);
            buf.set_string(col, down as u16, EIGHTHS[7 - usize::from(eighths)], inverted);
        }
    }
}

/// Splits a half-height in rows into full cells and leftover eighths.
fn split_eighths(half: f32) -> (u16, u16) {
    let clamped = half.max(0.0);
    let mut full = clamped.floor() as u16;
    let mut eighths = ((clamped - f32::from(full)) * 8.0).round() as u16;
    if eighths == 8 {
        full += 1;
        eighths = 0;
    }
    (full, eighths)
}

/// Column of the seek position for a given display width.
fn progress_column(width: u16, progress: u8) -> u16 {
    (f32::from(width) * f32::from(progress.min(100)) / 100.0).round() as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_eighths() {
        assert_eq!(split_eighths(0.0), (0, 0));
        assert_eq!(split_eighths(2.0), (2, 0));
        assert_eq!(split_eighths(2.5), (2, 4));
        assert_eq!(split_eighths(-1.0), (0, 0));
    }

    #[test]
    fn test_split_eighths_carries_to_full() {
        // 0.99 rounds to 8 eighths, which carries into a full cell.
        assert_eq!(split_eighths(0.99), (1, 0));
        assert_eq!(split_eighths(1.96), (2, 0));
    }

    #[test]
    fn test_progress_column() {
        assert_eq!(progress_column(100, 0), 0);
        assert_eq!(progress_column(100, 50), 50);
        assert_eq!(progress_column(100, 100), 100);
        assert_eq!(progress_column(80, 25), 20);
    }

    #[test]
    fn test_render_mirrors_around_midline() {
        let frame = vec![BarSample {
            x: 0.0,
            half_height: 2.0,
        }];
        let area = Rect::new(0, 0, 20, 10);
        let mut buf = Buffer::empty(area);
        WaveBars::new(&frame).render(area, &mut buf);

        // Midline at row 5: two full rows up (3, 4) and down (5, 6).
        assert_eq!(buf[(0, 3)].symbol(), "█");
        assert_eq!(buf[(0, 4)].symbol(), "█");
        assert_eq!(buf[(0, 5)].symbol(), "█");
        assert_eq!(buf[(0, 6)].symbol(), "█");
        assert_eq!(buf[(0, 2)].symbol(), " ");
        assert_eq!(buf[(0, 7)].symbol(), " ");
    }

    #[test]
    fn test_render_clips_to_area() {
        let frame = vec![
            BarSample {
                x: 18.0,
                half_height: 100.0,
            },
            BarSample {
                x: 500.0,
                half_height: 3.0,
            },
        ];
        let area = Rect::new(0, 0, 20, 10);
        let mut buf = Buffer::empty(area);
        // Oversized heights and off-surface positions must not panic.
        WaveBars::new(&frame).bar_width(4).render(area, &mut buf);
        assert_eq!(buf[(18, 0)].symbol(), "█");
    }
}
