// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Terminal display for tabula results.
//!
//! OneDark on dark terminals, One Light on light ones. `TABULA_THEME` wins if
//! set, then `COLORFGBG`, then dark. `NO_COLOR` and non-TTY stdout turn colour
//! off entirely, so piped output stays plain text.

use std::sync::OnceLock;

use crate::searcher::SearchResults;
use crate::types::Query;

/// Width between │ and │ (excluding border chars)
pub const BOX_WIDTH: usize = 80;

// ═══════════════════════════════════════════════════════════════════════════
// THEME DETECTION
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

static THEME: OnceLock<Theme> = OnceLock::new();

fn detect_theme() -> Theme {
    if let Ok(theme) = std::env::var("TABULA_THEME") {
        match theme.to_lowercase().as_str() {
            "light" | "l" => return Theme::Light,
            "dark" | "d" => return Theme::Dark,
            _ => {}
        }
    }

    // "fg;bg", bg 7+ (except 8) is a light background
    if let Ok(colorfgbg) = std::env::var("COLORFGBG") {
        if let Some(Ok(bg)) = colorfgbg.split(';').next_back().map(str::parse::<u8>) {
            if bg >= 7 && bg != 8 {
                return Theme::Light;
            }
        }
    }

    Theme::Dark
}

pub fn theme() -> Theme {
    *THEME.get_or_init(detect_theme)
}

// ═══════════════════════════════════════════════════════════════════════════
// PALETTES
// ═══════════════════════════════════════════════════════════════════════════

fn rgb((r, g, b): (u8, u8, u8)) -> String {
    format!("\x1b[38;2;{};{};{}m", r, g, b)
}

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";

mod onedark {
    pub const RED: (u8, u8, u8) = (224, 108, 117);
    pub const GREEN: (u8, u8, u8) = (152, 195, 121);
    pub const YELLOW: (u8, u8, u8) = (229, 192, 123);
    pub const BLUE: (u8, u8, u8) = (97, 175, 239);
    pub const CYAN: (u8, u8, u8) = (86, 182, 194);
    pub const GRAY: (u8, u8, u8) = (92, 99, 112);
}

mod onelight {
    pub const RED: (u8, u8, u8) = (228, 86, 73);
    pub const GREEN: (u8, u8, u8) = (80, 161, 79);
    pub const YELLOW: (u8, u8, u8) = (193, 132, 1);
    pub const BLUE: (u8, u8, u8) = (64, 120, 242);
    pub const CYAN: (u8, u8, u8) = (1, 132, 188);
    pub const GRAY: (u8, u8, u8) = (160, 161, 167);
}

macro_rules! theme_color {
    ($name:ident) => {
        #[allow(non_snake_case)]
        pub fn $name() -> String {
            rgb(match theme() {
                Theme::Dark => onedark::$name,
                Theme::Light => onelight::$name,
            })
        }
    };
}

theme_color!(RED);
theme_color!(GREEN);
theme_color!(YELLOW);
theme_color!(BLUE);
theme_color!(CYAN);
theme_color!(GRAY);

// ═══════════════════════════════════════════════════════════════════════════
// CORE UTILITIES
// ═══════════════════════════════════════════════════════════════════════════

/// Check if colors should be used (TTY detection)
pub fn use_colors() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    atty::is(atty::Stream::Stdout)
}

/// Apply theme color with optional modifiers
pub fn themed(color_fn: fn() -> String, modifiers: &[&str], text: &str) -> String {
    if use_colors() {
        format!("{}{}{}{}", modifiers.join(""), color_fn(), text, RESET)
    } else {
        text.to_string()
    }
}

/// Calculate visible length (excluding ANSI codes)
pub fn visible_len(s: &str) -> usize {
    let mut in_escape = false;
    let mut len = 0;
    for c in s.chars() {
        if c == '\x1b' {
            in_escape = true;
        } else if in_escape && c == 'm' {
            in_escape = false;
        } else if !in_escape {
            len += 1;
        }
    }
    len
}

/// Right-pad a styled string to a fixed visible width
pub fn pad_right(s: &str, width: usize) -> String {
    let visible = visible_len(s);
    if visible >= width {
        s.to_string()
    } else {
        format!("{}{}", s, " ".repeat(width - visible))
    }
}

/// Cut `text` to at most `max` characters, marking the cut with `…`.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept)
}

fn border(color_fn: fn() -> String) -> (String, &'static str) {
    if use_colors() {
        (color_fn(), RESET)
    } else {
        (String::new(), "")
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// BOX DRAWING
// ═══════════════════════════════════════════════════════════════════════════

/// │ content          │
pub fn row(content: &str) {
    let (b, reset) = border(GRAY);
    println!("{b}│{reset}{}{b}│{reset}", pad_right(content, BOX_WIDTH));
}

/// ┌─ LABEL ──────────┐
pub fn section_top(label: &str) {
    let (b, reset) = border(GRAY);
    let label_part = format!("─ {} ", themed(CYAN, &[BOLD], label));
    let remaining = BOX_WIDTH.saturating_sub(visible_len(&label_part));
    println!("{b}┌{reset}{}{b}{}┐{reset}", label_part, "─".repeat(remaining));
}

/// └──────────────────┘
pub fn section_bot() {
    let (b, reset) = border(GRAY);
    println!("{b}└{}┘{reset}", "─".repeat(BOX_WIDTH));
}

// ═══════════════════════════════════════════════════════════════════════════
// SEMANTIC FORMATTERS
// ═══════════════════════════════════════════════════════════════════════════

/// Blended scores live in [-1, 1]; BM25 fallback scores are unbounded.
pub fn score_value(score: f64, reranked: bool) -> String {
    let text = format!("{:>8.4}", score);
    if !use_colors() {
        return text;
    }
    let color: fn() -> String = if !reranked {
        GRAY
    } else if score >= 0.6 {
        GREEN
    } else if score >= 0.3 {
        YELLOW
    } else {
        RED
    };
    themed(color, &[], &text)
}

/// Color-coded timing value in ms
pub fn timing_ms(value: f64) -> String {
    let text = format!("{:.1} ms", value);
    let color: fn() -> String = if value < 50.0 {
        GREEN
    } else if value < 500.0 {
        YELLOW
    } else {
        RED
    };
    themed(color, &[], &text)
}

/// Print one query's results as a box.
pub fn print_results(query: &Query, results: &SearchResults<'_>, elapsed_ms: f64) {
    section_top(&format!("{} {}", query.id(), truncate(query.text(), 60)));

    if results.is_empty() {
        row(&themed(GRAY, &[DIM], " no tables matched"));
    }
    for (rank, hit) in results.hits().iter().enumerate() {
        let name = hit.document.table_name().unwrap_or("?");
        let page = hit.document.page_title().unwrap_or_default();
        let line = format!(
            " {:>3}  {}  {}  {}",
            rank + 1,
            score_value(hit.score, results.reranked()),
            themed(BLUE, &[BOLD], &pad_right(name, 24)),
            truncate(page, 36),
        );
        row(&line);
    }

    let status = match results.fallback_cause() {
        None => themed(GREEN, &[], "reranked"),
        Some(cause) => themed(
            YELLOW,
            &[],
            &format!("lexical order ({})", truncate(&cause.to_string(), 40)),
        ),
    };
    row(&format!(" {} results, {}, {}", results.len(), status, timing_ms(elapsed_ms)));
    section_bot();
}
