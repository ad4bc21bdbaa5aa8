use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{poll, read, Event, KeyCode, KeyEventKind},
    execute, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
    terminal::{
        disable_raw_mode, enable_raw_mode, size, Clear, ClearType, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use std::io::{self, stdout, Write};
use std::time::Duration;

/// Terminal back buffer.
///
/// Interactive terminals own raw mode and the alternate screen until dropped;
/// offscreen ones only collect cells for `write_ansi`.
pub struct Terminal {
    width: u16,
    height: u16,
    buffer: Vec<Vec<Cell>>,
    alternate_screen: bool,
}

/// A single cell in the terminal buffer
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    pub ch: char,
    pub fg: Option<Color>,
    pub bold: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: None,
            bold: false,
        }
    }
}

impl Terminal {
    /// Take over the real terminal
    pub fn interactive() -> io::Result<Self> {
        let (width, height) = size()?;
        enable_raw_mode()?;
        execute!(stdout(), EnterAlternateScreen, Hide)?;

        let mut term = Self::offscreen(width, height);
        term.alternate_screen = true;
        Ok(term)
    }

    /// A buffer with no screen behind it (print mode, tests)
    pub fn offscreen(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            buffer: vec![vec![Cell::default(); width as usize]; height as usize],
            alternate_screen: false,
        }
    }

    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    /// Follow a terminal resize. Returns true if the size changed.
    pub fn resize(&mut self, width: u16, height: u16) -> bool {
        if (width, height) == (self.width, self.height) {
            return false;
        }
        self.width = width;
        self.height = height;
        self.buffer = vec![vec![Cell::default(); width as usize]; height as usize];
        true
    }

    pub fn clear(&mut self) {
        for row in &mut self.buffer {
            row.fill(Cell::default());
        }
    }

    pub fn clear_screen(&self) -> io::Result<()> {
        execute!(stdout(), Clear(ClearType::All))
    }

    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        self.buffer.get(y as usize)?.get(x as usize)
    }

    /// Set a character at position; out of range writes are dropped
    pub fn set(&mut self, x: i32, y: i32, ch: char, fg: Option<Color>, bold: bool) {
        if x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32 {
            self.buffer[y as usize][x as usize] = Cell { ch, fg, bold };
        }
    }

    pub fn set_str(&mut self, x: i32, y: i32, s: &str, fg: Option<Color>, bold: bool) {
        for (i, ch) in s.chars().enumerate() {
            self.set(x + i as i32, y, ch, fg, bold);
        }
    }

    /// Flush the whole buffer to the screen
    pub fn present(&self) -> io::Result<()> {
        let mut out = stdout();

        for (y, row) in self.buffer.iter().enumerate() {
            queue!(out, MoveTo(0, y as u16))?;
            for cell in row {
                if cell.bold {
                    queue!(out, SetAttribute(Attribute::Bold))?;
                }
                match cell.fg {
                    Some(color) => queue!(out, SetForegroundColor(color), Print(cell.ch), ResetColor)?,
                    None => queue!(out, Print(cell.ch))?,
                }
                if cell.bold {
                    queue!(out, SetAttribute(Attribute::Reset))?;
                }
            }
        }

        out.flush()
    }

    /// Non-blocking key check
    pub fn check_key(&self) -> io::Result<Option<KeyCode>> {
        self.wait_key(Duration::ZERO)
    }

    /// Wait up to `timeout` for a key press
    pub fn wait_key(&self, timeout: Duration) -> io::Result<Option<KeyCode>> {
        if poll(timeout)? {
            if let Event::Key(key) = read()? {
                if key.kind != KeyEventKind::Release {
                    return Ok(Some(key.code));
                }
            }
        }
        Ok(None)
    }

    pub fn sleep(&self, seconds: f32) {
        std::thread::sleep(Duration::from_secs_f32(seconds.max(0.0)));
    }

    /// Write the buffer as ANSI-colored text lines (print mode)
    pub fn write_ansi<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for row in &self.buffer {
            let line_end = row.iter().rposition(|c| c.ch != ' ').map_or(0, |i| i + 1);
            for cell in &row[..line_end] {
                if cell.ch == ' ' {
                    write!(out, " ")?;
                    continue;
                }
                if cell.bold {
                    write!(out, "\x1b[1m")?;
                }
                if let Some(code) = cell.fg.and_then(ansi_fg) {
                    write!(out, "{}", code)?;
                }
                write!(out, "{}\x1b[0m", cell.ch)?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

fn ansi_fg(color: Color) -> Option<String> {
    let code = match color {
        Color::Rgb { r, g, b } => return Some(format!("\x1b[38;2;{};{};{}m", r, g, b)),
        Color::AnsiValue(v) => return Some(format!("\x1b[38;5;{}m", v)),
        Color::Black => 30,
        Color::DarkRed => 31,
        Color::DarkGreen => 32,
        Color::DarkYellow => 33,
        Color::DarkBlue => 34,
        Color::DarkMagenta => 35,
        Color::DarkCyan => 36,
        Color::Grey => 37,
        Color::DarkGrey => 90,
        Color::Red => 91,
        Color::Green => 92,
        Color::Yellow => 93,
        Color::Blue => 94,
        Color::Magenta => 95,
        Color::Cyan => 96,
        Color::White => 97,
        _ => return None,
    };
    Some(format!("\x1b[{}m", code))
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if self.alternate_screen {
            let _ = execute!(stdout(), Show, LeaveAlternateScreen);
            let _ = disable_raw_mode();
        }
    }
}

// ============================================================================
// Braille canvas
// ============================================================================

/// Sub-cell canvas: each terminal cell holds a 2x4 braille dot matrix.
///
/// Every dot remembers the highest-layer color drawn on it; a cell takes the
/// color of its highest dot.
pub struct BrailleCanvas {
    width: usize,    // In dots
    height: usize,
    dots: Vec<Option<(u8, Color)>>,
}

const DOT_BITS: [[u8; 2]; 4] = [
    [0x01, 0x08],
    [0x02, 0x10],
    [0x04, 0x20],
    [0x40, 0x80],
];

impl BrailleCanvas {
    pub fn new(cols: u16, rows: u16) -> Self {
        let width = cols as usize * 2;
        let height = rows as usize * 4;
        Self {
            width,
            height,
            dots: vec![None; width * height],
        }
    }

    /// Size in dots
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn clear(&mut self) {
        self.dots.fill(None);
    }

    /// Set a dot unless a higher layer already owns it
    pub fn plot(&mut self, x: i32, y: i32, layer: u8, color: Color) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let dot = &mut self.dots[y as usize * self.width + x as usize];
        if dot.map_or(true, |(existing, _)| layer >= existing) {
            *dot = Some((layer, color));
        }
    }

    /// Filled diamond of radius `r` dots
    pub fn plot_disc(&mut self, x: i32, y: i32, r: i32, layer: u8, color: Color) {
        for dy in -r..=r {
            for dx in -r..=r {
                if dx.abs() + dy.abs() <= r {
                    self.plot(x + dx, y + dy, layer, color);
                }
            }
        }
    }

    pub fn is_set(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.dots[y * self.width + x].is_some()
    }

    /// Compose braille characters into the terminal buffer
    pub fn blit(&self, term: &mut Terminal) {
        let (cols, rows) = term.size();
        for cy in 0..(rows as usize).min(self.height / 4) {
            for cx in 0..(cols as usize).min(self.width / 2) {
                let mut bits = 0u8;
                let mut top: Option<(u8, Color)> = None;

                for (row, row_bits) in DOT_BITS.iter().enumerate() {
                    for (col, bit) in row_bits.iter().enumerate() {
                        let idx = (cy * 4 + row) * self.width + cx * 2 + col;
                        if let Some((layer, color)) = self.dots[idx] {
                            bits |= bit;
                            if top.map_or(true, |(l, _)| layer >= l) {
                                top = Some((layer, color));
                            }
                        }
                    }
                }

                if let Some((layer, color)) = top {
                    let ch = char::from_u32(0x2800 + bits as u32).unwrap_or(' ');
                    term.set(cx as i32, cy as i32, ch, Some(color), layer >= BOLD_LAYER);
                }
            }
        }
    }
}

/// Layers at or above this render bold
pub const BOLD_LAYER: u8 = 7;
