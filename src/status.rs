//! One-line terminal overlay showing what the engine is doing

use crossterm::terminal::{self, ClearType};
use crossterm::{cursor, queue};
use std::io::{self, Write, stdout};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::dispatch::EngineStatus;
use crate::gesture::Phase;

const BAR_CELLS: usize = 10;

/// Plain-text status for one tick (no escape codes)
pub fn render(status: &EngineStatus) -> String {
    let mut parts = Vec::new();

    if status.no_hand() {
        parts.push("✋ no hand".to_string());
    } else {
        parts.push(format!("✋ {}", status.hands));
    }

    match status.active() {
        Some(kind) => parts.push(format!("▶ {}", kind)),
        None => {
            let confirming = status
                .gestures
                .iter()
                .filter(|g| g.phase == Phase::Confirming)
                .max_by(|a, b| a.confirmation.total_cmp(&b.confirmation));
            match confirming {
                Some(g) => parts.push(format!(
                    "{} {} {:>3.0}%",
                    g.kind,
                    progress_bar(g.confirmation),
                    g.confirmation * 100.0
                )),
                None => parts.push("idle".to_string()),
            }
        }
    }

    let cooling: Vec<String> = status
        .gestures
        .iter()
        .filter(|g| !g.cooldown_remaining.is_zero())
        .map(|g| format!("{} {}ms", g.kind, g.cooldown_remaining.as_millis()))
        .collect();
    if !cooling.is_empty() {
        parts.push(format!("⏳ {}", cooling.join(", ")));
    }

    if let Some(message) = &status.voice {
        parts.push(format!("🎙 {}", message));
    }

    parts.join(" │ ")
}

fn progress_bar(fraction: f32) -> String {
    let filled = ((fraction.clamp(0.0, 1.0) * BAR_CELLS as f32).round() as usize).min(BAR_CELLS);
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_CELLS - filled))
}

/// Cut `text` to at most `max_width` terminal columns
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        // leave room for the ellipsis
        if used + w + 1 > max_width {
            break;
        }
        used += w;
        out.push(c);
    }
    if max_width > 0 {
        out.push('…');
    }
    out
}

/// Redraws the status in place on stdout
pub struct StatusLine {
    last: String,
    drawn: bool,
}

impl StatusLine {
    pub fn new() -> Self {
        Self {
            last: String::new(),
            drawn: false,
        }
    }

    pub fn draw(&mut self, status: &EngineStatus) -> io::Result<()> {
        let term_width = terminal::size().map(|(w, _)| w as usize).unwrap_or(80);
        let line = truncate_to_width(&render(status), term_width.saturating_sub(1));
        if self.drawn && line == self.last {
            return Ok(());
        }

        let mut out = stdout();
        queue!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            crossterm::style::Print("\x1b[90m"),
            crossterm::style::Print(&line),
            crossterm::style::Print("\x1b[0m")
        )?;
        out.flush()?;
        self.last = line;
        self.drawn = true;
        Ok(())
    }

    /// Leave the last status on its own line
    pub fn finish(&mut self) -> io::Result<()> {
        if self.drawn {
            let mut out = stdout();
            queue!(out, crossterm::style::Print("\r\n"))?;
            out.flush()?;
            self.drawn = false;
        }
        Ok(())
    }
}

impl Default for StatusLine {
    fn default() -> Self {
        Self::new()
    }
}
