use console::{Emoji, style};

use crate::core::catalog::{Notice, NoticeKind};
use crate::core::memory::{Turn, TurnRole};

pub static SUCCESS_ICON: Emoji<'_, '_> = Emoji("✅ ", "");
pub static INFO_ICON: Emoji<'_, '_> = Emoji("ℹ️  ", "");
pub static WARN_ICON: Emoji<'_, '_> = Emoji("⚠️  ", "");
pub static ERROR_ICON: Emoji<'_, '_> = Emoji("❌ ", "");
pub static GEAR: Emoji<'_, '_> = Emoji("⚙️  ", "");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "");
pub static USER_ICON: Emoji<'_, '_> = Emoji("🧑 ", "> ");
pub static ROBOT: Emoji<'_, '_> = Emoji("🤖 ", "< ");

pub fn print_success(msg: &str) {
    println!("{} {}", SUCCESS_ICON, style(msg).green());
}

pub fn print_info(msg: &str) {
    println!("{} {}", INFO_ICON, style(msg).blue());
}

pub fn print_warn(msg: &str) {
    println!("{} {}", WARN_ICON, style(msg).yellow());
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", ERROR_ICON, style(msg).red().bold());
}

pub fn print_status(label: &str, msg: &str) {
    println!("  {} {}: {}", GEAR, style(label).bold().cyan(), msg);
}

/// Render one conversation turn.
pub fn print_turn(turn: &Turn) {
    match turn.role {
        TurnRole::User => println!("\n{}{}", USER_ICON, style(&turn.content).bold()),
        TurnRole::Assistant => println!("\n{}{}", ROBOT, turn.content),
    }
}

/// Store notices are rendered as errors, the way the chat page showed them.
pub fn print_notice(notice: &Notice) {
    match notice.kind {
        NoticeKind::ConnectionError | NoticeKind::QueryError => print_error(&notice.message),
    }
}

/// A titled block of help or status lines, built up and printed in one go.
pub struct GuideSection {
    title: String,
    lines: Vec<String>,
}

impl GuideSection {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            lines: Vec::new(),
        }
    }

    pub fn command(mut self, name: &str, desc: &str) -> Self {
        self.lines.push(format!(
            "  {:<22} {}",
            style(name).green().bold(),
            style(desc).dim()
        ));
        self
    }

    pub fn status(mut self, label: &str, value: &str) -> Self {
        self.lines
            .push(format!("  {} {}", style(format!("{}:", label)).bold(), value));
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.lines.push(format!("  {}", text));
        self
    }

    pub fn numbered(mut self, n: usize, text: &str) -> Self {
        self.lines
            .push(format!("  {} {}", style(format!("{:>2}.", n)).cyan(), text));
        self
    }

    pub fn hint(mut self, cmd: &str, note: &str) -> Self {
        if note.is_empty() {
            self.lines.push(format!("    $ {}", style(cmd).cyan()));
        } else {
            self.lines.push(format!(
                "    $ {}  {}",
                style(cmd).cyan(),
                style(format!("# {}", note)).dim()
            ));
        }
        self
    }

    pub fn info(mut self, text: &str) -> Self {
        self.lines.push(format!("  {}{}", INFO_ICON, text));
        self
    }

    pub fn blank(mut self) -> Self {
        self.lines.push(String::new());
        self
    }

    pub fn print(&self) {
        println!("\n {}", style(&self.title).bold().cyan().underlined());
        for line in &self.lines {
            println!("{}", line);
        }
    }
}

pub fn print_banner() {
    let lines: &[&str] = &[
        "           _        _                ",
        "  ___ __ _| |_ __ _| | ___   __ _    ",
        " / __/ _` | __/ _` | |/ _ \\ / _` |   ",
        "| (_| (_| | || (_| | | (_) | (_| |   ",
        " \\___\\__,_|\\__\\__,_|_|\\___/ \\__, |   ",
        "                            |___/    ",
    ];

    // Gradient: #818cf8 → #a78bfa → #22d3ee (diagonal top-left → bottom-right)
    let stops: [(u8, u8, u8); 3] = [(129, 140, 248), (167, 139, 250), (34, 211, 238)];
    let max_w = 36u32;
    let max_d = max_w + 5 * 10;

    println!();
    for (y, line) in lines.iter().enumerate() {
        for (x, ch) in line.chars().enumerate() {
            if ch == ' ' {
                print!(" ");
                continue;
            }
            let d = ((x as u32 + y as u32 * 10) * 1000 / max_d).min(1000);
            let (r, g, b) = if d <= 500 {
                lerp_color(stops[0], stops[1], d * 2)
            } else {
                lerp_color(stops[1], stops[2], (d - 500) * 2)
            };
            print!("\x1b[38;2;{};{};{}m{}", r, g, b, ch);
        }
        println!();
    }
    print!("\x1b[0m");

    println!("\x1b[38;2;34;211;238mVirtual Assistant - Computer Store\x1b[0m\n");
}

fn lerp_color(a: (u8, u8, u8), b: (u8, u8, u8), t: u32) -> (u8, u8, u8) {
    let r = (a.0 as u32 * (1000 - t) + b.0 as u32 * t) / 1000;
    let g = (a.1 as u32 * (1000 - t) + b.1 as u32 * t) / 1000;
    let b_val = (a.2 as u32 * (1000 - t) + b.2 as u32 * t) / 1000;
    (r as u8, g as u8, b_val as u8)
}

pub fn print_goodbye() {
    println!(
        "\n{} {}",
        SPARKLE,
        style("Thanks for shopping with us. See you next time!")
            .bold()
            .cyan()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_hits_both_ends() {
        let a = (0, 100, 200);
        let b = (200, 100, 0);
        assert_eq!(lerp_color(a, b, 0), a);
        assert_eq!(lerp_color(a, b, 1000), b);
        assert_eq!(lerp_color(a, b, 500), (100, 100, 100));
    }

    #[test]
    fn guide_section_collects_lines_in_order() {
        let section = GuideSection::new("Chat")
            .command("/reset", "Clear the conversation")
            .blank()
            .text("done");
        assert_eq!(section.lines.len(), 3);
        assert!(section.lines[0].contains("/reset"));
        assert!(section.lines[1].is_empty());
        assert!(section.lines[2].ends_with("done"));
    }
}
