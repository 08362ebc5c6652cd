use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;
use crossterm::style::{Attribute, Stylize};
use unicode_width::UnicodeWidthStr;

// ═══════════════════════════════════════════════════════════════════════════════
// Clap Styles
// ═══════════════════════════════════════════════════════════════════════════════

pub fn get_styles() -> Styles {
    let heading = Style::new()
        .bold()
        .underline()
        .fg_color(Some(Color::Ansi(AnsiColor::Yellow)));
    let good = Style::new()
        .bold()
        .fg_color(Some(Color::Ansi(AnsiColor::Green)));
    let bad = Style::new()
        .bold()
        .fg_color(Some(Color::Ansi(AnsiColor::Red)));

    Styles::styled()
        .usage(heading)
        .header(heading)
        .literal(good)
        .valid(good)
        .invalid(bad)
        .error(bad)
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Palette
// ═══════════════════════════════════════════════════════════════════════════════

pub mod colors {
    use crossterm::style::Color;

    pub const AMBER: Color = Color::Rgb {
        r: 255,
        g: 191,
        b: 0,
    };
    pub const COFFEE: Color = Color::Rgb {
        r: 166,
        g: 123,
        b: 91,
    };
    pub const GREEN: Color = Color::Rgb {
        r: 80,
        g: 220,
        b: 120,
    };
    pub const RED: Color = Color::Rgb {
        r: 255,
        g: 85,
        b: 85,
    };
    pub const DIM: Color = Color::Rgb {
        r: 128,
        g: 128,
        b: 128,
    };
    pub const WHITE: Color = Color::Rgb {
        r: 255,
        g: 255,
        b: 255,
    };
}

mod box_chars {
    pub const ROUND_TOP_LEFT: &str = "╭";
    pub const ROUND_TOP_RIGHT: &str = "╮";
    pub const ROUND_BOTTOM_LEFT: &str = "╰";
    pub const ROUND_BOTTOM_RIGHT: &str = "╯";
    pub const HORIZONTAL: &str = "─";
    pub const VERTICAL: &str = "│";
    pub const T_LEFT: &str = "├";
    pub const T_RIGHT: &str = "┤";
    pub const T_TOP: &str = "┬";
    pub const T_BOTTOM: &str = "┴";
    pub const CROSS: &str = "┼";
    pub const STAR: &str = "★";
    pub const CHECK: &str = "✓";
    pub const CROSS_MARK: &str = "✗";
}

// ═══════════════════════════════════════════════════════════════════════════════
// Screen
// ═══════════════════════════════════════════════════════════════════════════════

pub fn print_banner(store_url: &str) {
    let title = format!("{} LOYALTY KIOSK {}", box_chars::STAR, box_chars::STAR);
    println!();
    println!("  {}", title.with(colors::AMBER).bold());
    println!(
        "  {}",
        format!("points store: {}", store_url).with(colors::DIM)
    );
    println!(
        "  {}",
        "Type 'help' for available commands"
            .with(colors::DIM)
            .attribute(Attribute::Italic)
    );
    println!();
}

pub fn print_success(message: &str) {
    println!(
        " {} {}",
        box_chars::CHECK.with(colors::GREEN).bold(),
        message.with(colors::GREEN)
    );
}

pub fn print_error(message: &str) {
    println!(
        " {} {}",
        box_chars::CROSS_MARK.with(colors::RED).bold(),
        message.with(colors::RED)
    );
}

/// One status line with the typed phone number and the last shown balance.
pub fn print_status(phone_input: &str, points: Option<u32>) {
    let phone = if phone_input.is_empty() {
        "(none)".to_string()
    } else {
        phone_input.to_string()
    };
    let points = points.map_or_else(|| "-".to_string(), |p| p.to_string());
    println!(
        "  {} {}   {} {}",
        "phone:".with(colors::DIM),
        phone.with(colors::WHITE).bold(),
        "points:".with(colors::DIM),
        points.with(colors::COFFEE).bold()
    );
}

pub fn get_prompt() -> String {
    format!("{} ", "☕>".with(colors::COFFEE).bold())
}

pub fn print_goodbye() {
    println!();
    println!("  {}", "Kiosk closed.".with(colors::AMBER).bold());
    println!();
}

// ═══════════════════════════════════════════════════════════════════════════════
// Table Display
// ═══════════════════════════════════════════════════════════════════════════════

pub struct TableBuilder {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    col_widths: Vec<usize>,
}

impl TableBuilder {
    pub fn new(headers: Vec<&str>) -> Self {
        let col_widths: Vec<usize> = headers.iter().map(|h| h.width()).collect();
        TableBuilder {
            headers: headers.into_iter().map(String::from).collect(),
            rows: Vec::new(),
            col_widths,
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        for (i, cell) in row.iter().enumerate() {
            if i < self.col_widths.len() {
                self.col_widths[i] = self.col_widths[i].max(cell.width());
            }
        }
        self.rows.push(row);
    }

    fn print_border(&self, left: &str, middle: &str, right: &str) {
        print!("{}", left.with(colors::COFFEE));
        for (i, width) in self.col_widths.iter().enumerate() {
            print!("{}", box_chars::HORIZONTAL.repeat(width + 2).with(colors::COFFEE));
            if i + 1 < self.col_widths.len() {
                print!("{}", middle.with(colors::COFFEE));
            }
        }
        println!("{}", right.with(colors::COFFEE));
    }

    fn print_cells(&self, cells: &[String], header: bool) {
        print!("{}", box_chars::VERTICAL.with(colors::COFFEE));
        for (i, cell) in cells.iter().enumerate() {
            let width = self.col_widths.get(i).copied().unwrap_or(0);
            let padding = width.saturating_sub(cell.width());
            if header {
                print!(" {}{} ", cell.clone().with(colors::AMBER).bold(), " ".repeat(padding));
            } else {
                print!(" {}{} ", cell.clone().with(colors::WHITE), " ".repeat(padding));
            }
            print!("{}", box_chars::VERTICAL.with(colors::COFFEE));
        }
        println!();
    }

    pub fn print(&self) {
        self.print_border(
            box_chars::ROUND_TOP_LEFT,
            box_chars::T_TOP,
            box_chars::ROUND_TOP_RIGHT,
        );
        self.print_cells(&self.headers, true);
        self.print_border(box_chars::T_LEFT, box_chars::CROSS, box_chars::T_RIGHT);
        for row in &self.rows {
            self.print_cells(row, false);
        }
        self.print_border(
            box_chars::ROUND_BOTTOM_LEFT,
            box_chars::T_BOTTOM,
            box_chars::ROUND_BOTTOM_RIGHT,
        );
    }
}
