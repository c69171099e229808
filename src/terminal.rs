//! Terminal control.
//!
//! A thin wrapper over crossterm commands owning raw-mode acquisition and
//! the guaranteed teardown: whatever happens during playback, the cursor
//! comes back, attributes reset and the screen clears on every exit path.

use std::io::{stdout, Stdout, Write};

use anyhow::Result;
use crossterm::{
    cursor::{Hide, MoveTo, RestorePosition, SavePosition, Show},
    execute,
    style::ResetColor,
    terminal::{
        disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
        LeaveAlternateScreen, SetTitle,
    },
};
use log::debug;

pub struct TerminalControl {
    stdout: Stdout,
    raw: bool,
    cursor_hidden: bool,
    alternate: bool,
}

impl TerminalControl {
    pub fn new() -> Self {
        Self {
            stdout: stdout(),
            raw: false,
            cursor_hidden: false,
            alternate: false,
        }
    }

    /// Enter raw mode; no-op when already raw
    pub fn enter_raw(&mut self) -> Result<()> {
        if !self.raw {
            enable_raw_mode()?;
            self.raw = true;
            debug!("Raw mode enabled");
        }
        Ok(())
    }

    /// Leave raw mode; no-op when not raw
    pub fn leave_raw(&mut self) -> Result<()> {
        if self.raw {
            disable_raw_mode()?;
            self.raw = false;
            debug!("Raw mode disabled");
        }
        Ok(())
    }

    pub fn clear_screen(&mut self) -> Result<()> {
        execute!(self.stdout, Clear(ClearType::All))?;
        Ok(())
    }

    pub fn cursor_home(&mut self) -> Result<()> {
        execute!(self.stdout, MoveTo(0, 0))?;
        Ok(())
    }

    /// Move to a 1-based row and column
    pub fn move_cursor(&mut self, row: u16, col: u16) -> Result<()> {
        execute!(self.stdout, MoveTo(col.saturating_sub(1), row.saturating_sub(1)))?;
        Ok(())
    }

    /// Hide the cursor; idempotent
    pub fn hide_cursor(&mut self) -> Result<()> {
        if !self.cursor_hidden {
            execute!(self.stdout, Hide)?;
            self.cursor_hidden = true;
        }
        Ok(())
    }

    /// Show the cursor; idempotent
    pub fn show_cursor(&mut self) -> Result<()> {
        if self.cursor_hidden {
            execute!(self.stdout, Show)?;
            self.cursor_hidden = false;
        }
        Ok(())
    }

    pub fn save_position(&mut self) -> Result<()> {
        execute!(self.stdout, SavePosition)?;
        Ok(())
    }

    pub fn restore_position(&mut self) -> Result<()> {
        execute!(self.stdout, RestorePosition)?;
        Ok(())
    }

    pub fn set_title(&mut self, title: &str) -> Result<()> {
        execute!(self.stdout, SetTitle(title))?;
        Ok(())
    }

    pub fn enter_alternate_screen(&mut self) -> Result<()> {
        if !self.alternate {
            execute!(self.stdout, EnterAlternateScreen)?;
            self.alternate = true;
        }
        Ok(())
    }

    pub fn leave_alternate_screen(&mut self) -> Result<()> {
        if self.alternate {
            execute!(self.stdout, LeaveAlternateScreen)?;
            self.alternate = false;
        }
        Ok(())
    }

    /// Write pre-encoded escape bytes straight through
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.stdout.write_all(bytes)?;
        self.stdout.flush()?;
        Ok(())
    }

    /// Restore attributes, cursor and screen, and leave raw mode.
    /// Safe to call repeatedly and on partially initialized state.
    pub fn reset(&mut self) {
        let _ = execute!(self.stdout, ResetColor);
        let _ = self.show_cursor();
        let _ = self.leave_alternate_screen();
        let _ = self.clear_screen();
        let _ = execute!(self.stdout, MoveTo(0, 0));
        let _ = self.leave_raw();
        debug!("Terminal reset");
    }
}

impl Default for TerminalControl {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TerminalControl {
    fn drop(&mut self) {
        // Hidden cursors and raw mode must never leak to the shell
        if self.raw || self.cursor_hidden || self.alternate {
            self.reset();
        }
    }
}
