//! Terminal display backend and keyboard input
//!
//! Draws into an in-memory [`Screen`] and paints the whole screen with
//! crossterm on flush. Changed fields are shown bold red. The table view
//! runs on the alternate screen with the cursor hidden; [`TerminalBackend`]
//! puts both back when it is restored or dropped.

use std::io::{self, Write};
use std::thread;
use std::time::Duration;

use canlink_display::{DisplayBackend, DisplayError, Screen};
use crossterm::cursor::{Hide, MoveTo, MoveToNextLine, Show};
use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use crossterm::style::{Print, PrintStyledContent, Stylize};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use crossterm::{execute, queue};

/// Fallback size when the terminal cannot be queried
pub const DEFAULT_SIZE: (u16, u16) = (80, 24);

/// Crossterm backend over any writer
pub struct TerminalBackend<W: Write> {
    out: W,
    screen: Screen,
    /// Alternate screen entered, cursor hidden
    active: bool,
}

impl<W: Write> TerminalBackend<W> {
    /// Create a backend of `cols` x `rows` characters
    pub fn new(out: W, cols: u16, rows: u16) -> Self {
        Self {
            out,
            screen: Screen::new(cols, rows),
            active: false,
        }
    }

    /// Switch to the alternate screen and hide the cursor
    pub fn init(&mut self) -> Result<(), DisplayError> {
        execute!(self.out, EnterAlternateScreen, Hide, Clear(ClearType::All))
            .map_err(|_| DisplayError::Communication)?;
        self.active = true;
        Ok(())
    }

    /// Show the cursor and leave the alternate screen
    ///
    /// Does nothing unless [`TerminalBackend::init`] ran.
    pub fn restore(&mut self) -> Result<(), DisplayError> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        execute!(self.out, Show, LeaveAlternateScreen).map_err(|_| DisplayError::Communication)
    }

    /// Follow a terminal resize; the next flush repaints everything
    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.screen.resize(cols, rows);
    }

    #[cfg(test)]
    pub(crate) fn writer(&self) -> &W {
        &self.out
    }

    fn paint(&mut self) -> io::Result<()> {
        queue!(self.out, MoveTo(0, 0), Clear(ClearType::All))?;
        for row in 0..self.screen.lines().count() {
            for (text, highlighted) in self.screen.segments(row) {
                if highlighted {
                    queue!(self.out, PrintStyledContent(text.bold().red()))?;
                } else {
                    queue!(self.out, Print(text))?;
                }
            }
            queue!(self.out, MoveToNextLine(1))?;
        }
        self.out.flush()
    }
}

impl<W: Write> Drop for TerminalBackend<W> {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

/// What a terminal event asks the render loop to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Quit,
    Resize(u16, u16),
}

/// Map a terminal event to a render loop action
///
/// `q`, `Q`, Esc and Ctrl-C quit. Raw mode swallows the interrupt signal,
/// so Ctrl-C arrives here as a key.
pub fn control_for(event: &Event) -> Option<Control> {
    match event {
        Event::Key(key) => match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(Control::Quit),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Control::Quit)
            }
            _ => None,
        },
        Event::Resize(cols, rows) => Some(Control::Resize(*cols, *rows)),
        _ => None,
    }
}

/// Waits between polls, returning early on user input
pub trait Input {
    /// Wait up to `timeout` for one event
    fn wait(&mut self, timeout: Duration) -> io::Result<Option<Event>>;

    /// Whether a user is there to quit with a key
    fn interactive(&self) -> bool {
        false
    }

    /// Give the terminal back before the process exits
    fn release(&mut self) {}
}

/// Keyboard and resize events from the controlling terminal
///
/// Holds the terminal in raw mode until released or dropped.
pub struct TerminalInput {
    raw: bool,
}

impl TerminalInput {
    pub fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self { raw: true })
    }
}

impl Input for TerminalInput {
    fn wait(&mut self, timeout: Duration) -> io::Result<Option<Event>> {
        if event::poll(timeout)? {
            event::read().map(Some)
        } else {
            Ok(None)
        }
    }

    fn interactive(&self) -> bool {
        self.raw
    }

    fn release(&mut self) {
        if self.raw {
            self.raw = false;
            let _ = disable_raw_mode();
        }
    }
}

impl Drop for TerminalInput {
    fn drop(&mut self) {
        self.release();
    }
}

/// No input at all: sleeps through the timeout (log view, pipes)
pub struct NoInput;

impl Input for NoInput {
    fn wait(&mut self, timeout: Duration) -> io::Result<Option<Event>> {
        thread::sleep(timeout);
        Ok(None)
    }
}

/// Terminal size, or [`DEFAULT_SIZE`] when stdout is not a terminal
pub fn terminal_size() -> (u16, u16) {
    crossterm::terminal::size().unwrap_or(DEFAULT_SIZE)
}

impl<W: Write> DisplayBackend for TerminalBackend<W> {
    fn clear(&mut self) -> Result<(), DisplayError> {
        self.screen.clear()
    }

    fn draw_text(&mut self, row: u16, col: u16, text: &str) -> Result<(), DisplayError> {
        self.screen.draw_text(row, col, text)
    }

    fn invert_region(
        &mut self,
        row: u16,
        start_col: u16,
        end_col: u16,
    ) -> Result<(), DisplayError> {
        self.screen.invert_region(row, start_col, end_col)
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        if !self.screen.is_dirty() {
            return Ok(());
        }
        self.paint().map_err(|_| DisplayError::Communication)?;
        self.screen.mark_clean();
        Ok(())
    }

    fn dimensions(&self) -> (u16, u16) {
        self.screen.dimensions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(backend: &TerminalBackend<Vec<u8>>) -> String {
        String::from_utf8_lossy(backend.writer()).into_owned()
    }

    #[test]
    fn test_flush_paints_text() {
        let mut backend = TerminalBackend::new(Vec::new(), 20, 2);
        backend.draw_text(0, 0, " 100 - 01 02").unwrap();
        backend.invert_region(0, 10, 12).unwrap();
        backend.flush().unwrap();

        let out = output(&backend);
        assert!(out.contains(" 100 - 01 "));
        assert!(out.contains("02"));
        // Highlight is styled, so an escape sequence precedes it
        let styled = out.find("02").unwrap();
        assert!(out[..styled].ends_with('m'));
    }

    #[test]
    fn test_flush_skips_clean_screen() {
        let mut backend = TerminalBackend::new(Vec::new(), 20, 2);
        backend.draw_text(0, 0, "x").unwrap();
        backend.flush().unwrap();
        let len = backend.writer().len();

        backend.flush().unwrap();
        assert_eq!(backend.writer().len(), len);
    }

    #[test]
    fn test_restore_shows_cursor_once() {
        let mut backend = TerminalBackend::new(Vec::new(), 20, 2);
        backend.restore().unwrap();
        assert!(backend.writer().is_empty());

        backend.init().unwrap();
        assert!(output(&backend).contains("\x1b[?25l"));
        backend.restore().unwrap();
        let out = output(&backend);
        assert!(out.contains("\x1b[?25h"));
        assert!(out.ends_with("\x1b[?1049l"));

        let len = backend.writer().len();
        backend.restore().unwrap();
        assert_eq!(backend.writer().len(), len);
    }

    #[test]
    fn test_drop_restores_terminal() {
        let mut buf = Vec::new();
        {
            let mut backend = TerminalBackend::new(&mut buf, 20, 2);
            backend.init().unwrap();
        }
        let out = String::from_utf8_lossy(&buf);
        assert!(out.contains("\x1b[?25h"));
        assert!(out.contains("\x1b[?1049l"));
    }

    #[test]
    fn test_resize_repaints() {
        let mut backend = TerminalBackend::new(Vec::new(), 20, 2);
        backend.draw_text(0, 0, "abcdef").unwrap();
        backend.flush().unwrap();

        backend.resize(3, 4);
        assert_eq!(backend.dimensions(), (3, 4));
        let len = backend.writer().len();
        backend.flush().unwrap();
        assert!(backend.writer().len() > len);
    }

    #[test]
    fn test_quit_keys() {
        use crossterm::event::KeyEvent;

        let key = |code, modifiers| Event::Key(KeyEvent::new(code, modifiers));
        assert_eq!(
            control_for(&key(KeyCode::Char('q'), KeyModifiers::NONE)),
            Some(Control::Quit)
        );
        assert_eq!(
            control_for(&key(KeyCode::Char('Q'), KeyModifiers::SHIFT)),
            Some(Control::Quit)
        );
        assert_eq!(
            control_for(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Control::Quit)
        );
        assert_eq!(control_for(&key(KeyCode::Char('c'), KeyModifiers::NONE)), None);
        assert_eq!(
            control_for(&Event::Resize(100, 30)),
            Some(Control::Resize(100, 30))
        );
    }

    #[test]
    fn test_dimensions() {
        let backend = TerminalBackend::new(Vec::new(), 40, 10);
        assert_eq!(backend.dimensions(), (40, 10));
    }
}
