use super::Renderer;
use crate::utils::error::RuntimeError;
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use image::RgbImage;
use std::io::{self, Stdout, Write};
use std::time::Duration;

/// Draws every named view as a panel of half-block cells in 24-bit color.
/// Panels sit side by side in order of first appearance. Esc, `q` or Ctrl-C request quit.
pub struct TerminalRenderer {
    out: Stdout,
    scale: u32,
    panels: Vec<(String, RgbImage)>,
}

impl TerminalRenderer {
    /// Switches the terminal to raw mode on the alternate screen. Fails if stdout is not a terminal.
    pub fn new(scale: u32) -> Result<Self, RuntimeError> {
        let mut out = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(
            out,
            EnterAlternateScreen,
            DisableLineWrap,
            cursor::Hide,
            terminal::Clear(ClearType::All)
        )?;
        Ok(TerminalRenderer {
            out,
            scale,
            panels: vec![],
        })
    }

    fn redraw_all(&mut self) -> Result<(), RuntimeError> {
        queue!(self.out, terminal::Clear(ClearType::All))?;
        for index in 0..self.panels.len() {
            self.draw_panel(index)?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn draw_panel(&mut self, index: usize) -> Result<(), RuntimeError> {
        let (cols, rows) = terminal::size()?;
        let panel_cols = (cols as usize / self.panels.len()).saturating_sub(1).max(1);
        let panel_rows = (rows as usize).saturating_sub(1).max(1);
        let x0 = (index * (panel_cols + 1)) as u16;

        let (name, image) = &self.panels[index];
        let (width, height) = (image.width() as usize, image.height() as usize);

        // Each cell shows two vertically stacked pixels, sampled every `stride` pixels
        let stride = width
            .div_ceil(panel_cols)
            .max(height.div_ceil(2 * panel_rows))
            .max(1);
        let cell_cols = width / stride;
        let cell_rows = height / (2 * stride);

        queue!(
            self.out,
            BeginSynchronizedUpdate,
            cursor::MoveTo(x0, 0),
            ResetColor,
            Print(name.chars().take(panel_cols).collect::<String>())
        )?;
        for row in 0..cell_rows {
            queue!(self.out, cursor::MoveTo(x0, row as u16 + 1))?;
            for col in 0..cell_cols {
                let px = (col * stride) as u32;
                let top = image.get_pixel(px, (2 * row * stride) as u32).0;
                let bottom = image.get_pixel(px, ((2 * row + 1) * stride) as u32).0;
                queue!(
                    self.out,
                    SetForegroundColor(rgb(top)),
                    SetBackgroundColor(rgb(bottom)),
                    Print('▀')
                )?;
            }
        }
        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        Ok(())
    }
}

fn rgb([r, g, b]: [u8; 3]) -> Color {
    Color::Rgb { r, g, b }
}

impl Renderer for TerminalRenderer {
    fn show(&mut self, name: &str, image: &RgbImage) -> Result<(), RuntimeError> {
        match self.panels.iter().position(|(view, _)| view == name) {
            Some(index) => {
                self.panels[index].1 = image.clone();
                self.draw_panel(index)?;
                self.out.flush()?;
            }
            None => {
                // A new panel changes the layout of all the others
                self.panels.push((name.to_string(), image.clone()));
                self.redraw_all()?;
            }
        }
        Ok(())
    }

    fn quit_requested(&mut self) -> Result<bool, RuntimeError> {
        while event::poll(Duration::ZERO)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Esc | KeyCode::Char('q') => return Ok(true),
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        return Ok(true)
                    }
                    _ => {}
                },
                Event::Resize(..) => self.redraw_all()?,
                _ => {}
            }
        }
        Ok(false)
    }

    fn scale(&self) -> u32 {
        self.scale
    }
}

impl Drop for TerminalRenderer {
    fn drop(&mut self) {
        let _ = execute!(
            self.out,
            ResetColor,
            cursor::Show,
            EnableLineWrap,
            LeaveAlternateScreen
        );
        let _ = terminal::disable_raw_mode();
    }
}
