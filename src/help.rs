use crate::terminal::Terminal;
use crossterm::style::Color;

pub const FLY_HELP: &str = "\
FLIGHT
─────────────────────
Enter/f  Start flight
Space    Pause/resume
r        Replay
j/k      Select hop
1-5      Speed 0.5x-5x
h        Toggle heatmap
c        Toggle cables
?        Close help
q/Esc    Quit";

/// Draw a centered box with `help_text` over whatever is in the buffer.
pub fn render_help_overlay(term: &mut Terminal, help_text: &str) {
    if help_text.is_empty() {
        return;
    }
    let (width, height) = term.size();

    let lines: Vec<&str> = help_text.lines().collect();
    let max_width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let box_width = max_width + 4; // 2 chars padding each side
    let box_height = lines.len() + 2;

    let x0 = (width as usize).saturating_sub(box_width) as i32 / 2;
    let y0 = (height as usize).saturating_sub(box_height) as i32 / 2;
    let right = x0 + box_width as i32 - 1;
    let bottom = y0 + box_height as i32 - 1;

    let border = Some(Color::White);
    let text = Some(Color::Grey);

    let rule = "─".repeat(box_width - 2);
    term.set_str(x0, y0, &format!("┌{}┐", rule), border, false);
    term.set_str(x0, bottom, &format!("└{}┘", rule), border, false);

    for (i, line) in lines.iter().enumerate() {
        let y = y0 + 1 + i as i32;
        let padding = max_width - line.chars().count();
        term.set(x0, y, '│', border, false);
        term.set_str(x0 + 1, y, &format!(" {}{} ", line, " ".repeat(padding)), text, i == 0);
        term.set(right, y, '│', border, false);
    }
}
