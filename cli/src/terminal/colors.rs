use colored::Color;

pub const PRIMARY: Color = Color::BrightGreen;
pub const ACCENT: Color = Color::BrightYellow;
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::White;
pub const IPV4_ADDR: Color = Color::BrightCyan;

pub const LOSS_NONE: Color = Color::Green;
pub const LOSS_PARTIAL: Color = Color::Yellow;
pub const LOSS_TOTAL: Color = Color::Red;
