//! Terminal user interface for the wave display.
//!
//! Owns the raw-mode/alternate-screen lifecycle, renders one wave frame per
//! tick, and maps key presses to run-loop commands.

use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    style::{Color, Style},
};
use std::io::{stdout, Stdout};
use std::time::Duration;

use super::bars::WaveBars;
use crate::signal::SampleFrame;

/// User input command during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveCommand {
    /// No key pressed (or an unrecognized one)
    Continue,
    /// Exit (Escape, 'q', Ctrl+C)
    Quit,
    /// Pause/resume the animation (Space)
    TogglePause,
    /// Show/hide the seek cursor ('c')
    ToggleCursor,
    /// Move the seek position by whole percent (Left/Right)
    SeekBy(i8),
    /// Adjust the manual level (Up/Down)
    NudgeLevel(i8),
    /// Change the scroll speed ('[' slower, ']' faster)
    SpeedBy(i8),
}

/// Per-frame state the footer and overlay need.
pub struct Hud {
    pub paused: bool,
    pub elapsed: Duration,
    pub level: u8,
    pub progress: u8,
    pub show_cursor: bool,
}

/// Terminal UI for the animated wave.
pub struct WaveTui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    bar_width: u16,
}

impl WaveTui {
    /// Creates the TUI and enters alternate screen mode.
    ///
    /// # Errors
    /// - If the terminal cannot be initialized
    /// - If raw mode or the alternate screen cannot be entered
    pub fn new(bar_width: u16) -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(WaveTui {
            terminal,
            bar_width: bar_width.max(1),
        })
    }

    /// Current wave surface size in cells: the terminal minus the footer
    /// row. Height is floored at 2 so the generator never sees a
    /// degenerate surface.
    pub fn wave_size(&self) -> anyhow::Result<(u16, u16)> {
        let size = self.terminal.size()?;
        let height = size.height.saturating_sub(1).max(2);
        Ok((size.width.max(1), height))
    }

    /// Draws one wave frame plus the footer.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn render(&mut self, wave: &SampleFrame, hud: &Hud) -> anyhow::Result<()> {
        let bar_width = self.bar_width;

        self.terminal.draw(|frame| {
            let area = frame.area();

            let footer_height = 1;
            let wave_area = Rect {
                x: area.x,
                y: area.y,
                width: area.width,
                height: area.height.saturating_sub(footer_height),
            };

            let bars = WaveBars::new(wave)
                .bar_width(bar_width)
                .progress(hud.progress)
                .show_cursor(hud.show_cursor);
            frame.render_widget(bars, wave_area);

            let footer_area = Rect {
                x: area.x,
                y: area.y + area.height.saturating_sub(footer_height),
                width: area.width,
                height: footer_height,
            };

            let indicator = if hud.paused {
                Span::styled("⏸ ", Style::default().fg(Color::Yellow))
            } else {
                Span::styled("∿ ", Style::default().fg(Color::Rgb(46, 209, 132)))
            };

            let duration_secs = hud.elapsed.as_secs();
            let minutes = duration_secs / 60;
            let secs = duration_secs % 60;

            let footer_text = Line::from(vec![
                indicator,
                Span::raw(format!("{minutes}:{secs:02}")),
                Span::raw(" / "),
                Span::raw(format!("level {}%", hud.level)),
                Span::raw(" / "),
                Span::raw(format!("seek {}%", hud.progress)),
            ]);

            let footer = ratatui::widgets::Paragraph::new(footer_text).style(
                Style::default()
                    .fg(Color::Rgb(185, 207, 212))
                    .bg(Color::Rgb(0, 0, 0)),
            );

            frame.render_widget(footer, footer_area);
        })?;

        Ok(())
    }

    /// Polls for user input and returns the matching command.
    ///
    /// # Errors
    /// - If event polling or reading fails
    pub fn handle_input(&mut self, timeout: Duration) -> anyhow::Result<WaveCommand> {
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                return Ok(match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => {
                        tracing::debug!("Escape or 'q' pressed: quitting");
                        WaveCommand::Quit
                    }
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        tracing::debug!("Ctrl+C pressed: quitting");
                        WaveCommand::Quit
                    }
                    KeyCode::Char(' ') => WaveCommand::TogglePause,
                    KeyCode::Char('c') => WaveCommand::ToggleCursor,
                    KeyCode::Left => WaveCommand::SeekBy(-1),
                    KeyCode::Right => WaveCommand::SeekBy(1),
                    KeyCode::Up => WaveCommand::NudgeLevel(5),
                    KeyCode::Down => WaveCommand::NudgeLevel(-5),
                    KeyCode::Char('[') => WaveCommand::SpeedBy(-1),
                    KeyCode::Char(']') => WaveCommand::SpeedBy(1),
                    _ => WaveCommand::Continue,
                });
            }
        }
        Ok(WaveCommand::Continue)
    }

    /// Restores the terminal and leaves alternate screen mode.
    ///
    /// # Errors
    /// - If terminal mode cannot be disabled
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            crossterm::terminal::LeaveAlternateScreen
        )?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}
