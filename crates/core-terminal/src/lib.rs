//! Terminal backend: raw-mode/alternate-screen lifecycle and full-grid
//! presentation.
//!
//! The editor reconstructs the whole cell grid on each draw; `present`
//! repaints it top to bottom, batching style changes, then places (or
//! hides) the hardware cursor and flushes. An RAII guard restores the
//! terminal on drop so panics and early returns leave the shell usable.

use anyhow::Result;
use core_render::{Attrs, Cell, CellGrid, Color};
use crossterm::style::{
    Attribute, Color as CColor, Print, SetAttribute, SetBackgroundColor, SetForegroundColor,
};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::io::{stdout, Write};

fn map_color(c: Color) -> CColor {
    match c {
        Color::Default => CColor::Reset,
        Color::Black => CColor::Black,
        Color::Red => CColor::DarkRed,
        Color::Green => CColor::DarkGreen,
        Color::Yellow => CColor::DarkYellow,
        Color::Blue => CColor::DarkBlue,
        Color::Magenta => CColor::DarkMagenta,
        Color::Cyan => CColor::DarkCyan,
        Color::White => CColor::Grey,
    }
}

pub trait TerminalBackend {
    fn enter(&mut self) -> Result<()>;
    fn leave(&mut self) -> Result<()>;
    fn size(&self) -> Result<(u16, u16)>;
    fn present(&mut self, grid: &CellGrid, cursor: Option<(u16, u16)>) -> Result<()>;
}

pub struct CrosstermBackend {
    entered: bool,
}

/// RAII guard ensuring terminal restoration even if the caller
/// early-returns or panics.
pub struct TerminalGuard<'a> {
    backend: &'a mut CrosstermBackend,
}

impl Default for CrosstermBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CrosstermBackend {
    pub fn new() -> Self {
        Self { entered: false }
    }

    /// Enter and return a guard that leaves on drop.
    pub fn enter_guard(&mut self) -> Result<TerminalGuard<'_>> {
        self.enter()?;
        Ok(TerminalGuard { backend: self })
    }

    /// Cooperative terminal suspend: restore the terminal, deliver SIGTSTP
    /// to ourselves, and re-enter once the shell resumes us. The caller
    /// forces a full resize afterwards.
    #[cfg(unix)]
    pub fn suspend(&mut self) -> Result<()> {
        self.leave()?;
        // SAFETY: raising SIGTSTP stops the process until SIGCONT; no
        // memory is touched.
        unsafe {
            libc::raise(libc::SIGTSTP);
        }
        self.enter()
    }

    #[cfg(not(unix))]
    pub fn suspend(&mut self) -> Result<()> {
        Ok(())
    }
}

impl TerminalBackend for CrosstermBackend {
    fn enter(&mut self) -> Result<()> {
        if !self.entered {
            enable_raw_mode()?;
            execute!(stdout(), EnterAlternateScreen, Hide)?;
            self.entered = true;
        }
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        if self.entered {
            execute!(stdout(), LeaveAlternateScreen, Show)?;
            disable_raw_mode()?;
            self.entered = false;
        }
        Ok(())
    }

    fn size(&self) -> Result<(u16, u16)> {
        Ok(crossterm::terminal::size()?)
    }

    fn present(&mut self, grid: &CellGrid, cursor: Option<(u16, u16)>) -> Result<()> {
        let mut out = stdout();
        queue!(out, Hide)?;
        let mut style: Option<(Color, Color, Attrs)> = None;
        for y in 0..grid.height() {
            queue!(out, MoveTo(0, y as u16))?;
            for x in 0..grid.width() {
                let Cell { ch, fg, bg, attrs } = grid.get(x, y);
                if style != Some((fg, bg, attrs)) {
                    queue!(out, SetAttribute(Attribute::Reset))?;
                    if attrs.contains(Attrs::BOLD) {
                        queue!(out, SetAttribute(Attribute::Bold))?;
                    }
                    if attrs.contains(Attrs::REVERSE) {
                        queue!(out, SetAttribute(Attribute::Reverse))?;
                    }
                    queue!(
                        out,
                        SetForegroundColor(map_color(fg)),
                        SetBackgroundColor(map_color(bg))
                    )?;
                    style = Some((fg, bg, attrs));
                }
                queue!(out, Print(ch))?;
            }
        }
        queue!(out, SetAttribute(Attribute::Reset))?;
        match cursor {
            Some((x, y)) => queue!(out, MoveTo(x, y), Show)?,
            None => queue!(out, Hide)?,
        }
        out.flush()?;
        Ok(())
    }
}

impl Drop for CrosstermBackend {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}

impl<'a> Drop for TerminalGuard<'a> {
    fn drop(&mut self) {
        let _ = self.backend.leave();
    }
}

impl<'a> std::ops::Deref for TerminalGuard<'a> {
    type Target = CrosstermBackend;
    fn deref(&self) -> &Self::Target {
        self.backend
    }
}

impl<'a> std::ops::DerefMut for TerminalGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.backend
    }
}
