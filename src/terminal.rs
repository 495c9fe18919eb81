use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{poll, read, Event, KeyCode, KeyModifiers},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        disable_raw_mode, enable_raw_mode, size, Clear, ClearType, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use std::io::{self, stdout, Write};
use std::time::Duration;

/// A single cell in the terminal buffer
#[derive(Clone, Copy, PartialEq)]
pub struct Cell {
    pub ch: char,
    pub fg: Option<Color>,
    pub bg: Option<Color>,
}

impl Default for Cell {
    fn default() -> Self {
        Self { ch: ' ', fg: None, bg: None }
    }
}

/// Input the animation loop cares about
pub enum TermEvent {
    Key(KeyCode, KeyModifiers),
    Resize(u16, u16),
}

/// Double-buffered terminal: draw into the back buffer, `present` writes the diff
pub struct Terminal {
    width: u16,
    height: u16,
    back: Vec<Cell>,
    front: Vec<Cell>,
    force_redraw: bool,
    alternate_screen: bool,
}

impl Terminal {
    /// Initialize the terminal for drawing
    pub fn new(alternate_screen: bool) -> io::Result<Self> {
        let (width, height) = size()?;

        if alternate_screen {
            enable_raw_mode()?;
            execute!(stdout(), EnterAlternateScreen, Hide)?;
        }

        let cells = width as usize * height as usize;
        Ok(Self {
            width,
            height,
            back: vec![Cell::default(); cells],
            front: vec![Cell::default(); cells],
            force_redraw: true,
            alternate_screen,
        })
    }

    /// Get terminal dimensions
    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    /// Reallocate both buffers; the next present repaints everything
    pub fn resize(&mut self, width: u16, height: u16) {
        let cells = width as usize * height as usize;
        self.width = width;
        self.height = height;
        self.back = vec![Cell::default(); cells];
        self.front = vec![Cell::default(); cells];
        self.force_redraw = true;
    }

    /// Clear the back buffer
    pub fn clear(&mut self) {
        self.back.fill(Cell::default());
    }

    /// Clear the actual terminal
    pub fn clear_screen(&mut self) -> io::Result<()> {
        execute!(stdout(), ResetColor, Clear(ClearType::All))?;
        self.force_redraw = true;
        Ok(())
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32 {
            Some(y as usize * self.width as usize + x as usize)
        } else {
            None
        }
    }

    /// Set a character with both foreground and background
    pub fn set_with_bg(&mut self, x: i32, y: i32, ch: char, fg: Option<Color>, bg: Option<Color>) {
        if let Some(i) = self.index(x, y) {
            self.back[i] = Cell { ch, fg, bg };
        }
    }

    /// Write changed cells to the screen and swap buffers
    pub fn present(&mut self) -> io::Result<()> {
        let mut out = stdout();
        let mut last_fg: Option<Option<Color>> = None;
        let mut last_bg: Option<Option<Color>> = None;
        let width = self.width as usize;

        for (i, cell) in self.back.iter().enumerate() {
            if !self.force_redraw && self.front[i] == *cell {
                continue;
            }
            let x = (i % width) as u16;
            let y = (i / width) as u16;
            queue!(out, MoveTo(x, y))?;

            if last_fg != Some(cell.fg) {
                queue!(out, SetForegroundColor(cell.fg.unwrap_or(Color::Reset)))?;
                last_fg = Some(cell.fg);
            }
            if last_bg != Some(cell.bg) {
                queue!(out, SetBackgroundColor(cell.bg.unwrap_or(Color::Reset)))?;
                last_bg = Some(cell.bg);
            }
            queue!(out, Print(cell.ch))?;
        }

        queue!(out, ResetColor)?;
        out.flush()?;

        self.front.copy_from_slice(&self.back);
        self.force_redraw = false;
        Ok(())
    }

    /// Next pending key or resize event (non-blocking)
    pub fn poll_event(&self) -> io::Result<Option<TermEvent>> {
        while poll(Duration::from_millis(0))? {
            match read()? {
                Event::Key(key) => return Ok(Some(TermEvent::Key(key.code, key.modifiers))),
                Event::Resize(w, h) => return Ok(Some(TermEvent::Resize(w, h))),
                _ => continue,
            }
        }
        Ok(None)
    }

    /// Sleep for specified duration
    pub fn sleep(&self, seconds: f32) {
        if seconds > 0.0 {
            std::thread::sleep(Duration::from_secs_f32(seconds));
        }
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if self.alternate_screen {
            let _ = execute!(stdout(), ResetColor, Show, LeaveAlternateScreen);
            let _ = disable_raw_mode();
        }
    }
}

/// Helper to create RGB colors
pub fn rgb(r: u8, g: u8, b: u8) -> Color {
    Color::Rgb { r, g, b }
}
