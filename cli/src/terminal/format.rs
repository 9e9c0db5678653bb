use crate::terminal::colors;
use colored::*;
use pingstat_common::stats::{HopRecord, HostStats};

pub fn rtt_ms(value: f64) -> String {
    format!("{value:.2} ms")
}

pub fn loss(percent: f64) -> ColoredString {
    padded_loss(percent, 0)
}

/// Loss right-aligned to `width` columns, padding applied before colouring.
pub fn padded_loss(percent: f64, width: usize) -> ColoredString {
    let color = if percent <= 0.0 {
        colors::LOSS_NONE
    } else if percent < 100.0 {
        colors::LOSS_PARTIAL
    } else {
        colors::LOSS_TOTAL
    };
    format!("{:>width$}", format!("{percent:.1}%")).color(color).bold()
}

/// Min/avg/max in one cell, or a dash when nothing answered.
pub fn rtt_range(min: f64, avg: f64, max: f64, received: u32) -> ColoredString {
    if received == 0 {
        return "-".color(colors::SEPARATOR);
    }
    format!("{min:.2} / {avg:.2} / {max:.2} ms").normal()
}

pub fn host_details(stats: &HostStats) -> Vec<(String, ColoredString)> {
    let address = match stats.address {
        Some(addr) => addr.to_string().color(colors::IPV4_ADDR),
        None => "unresolved".color(colors::LOSS_TOTAL),
    };

    vec![
        ("Address".to_string(), address),
        ("Replies".to_string(), format!("{}/{}", stats.received, stats.sent).normal()),
        ("Loss".to_string(), loss(stats.packet_loss)),
        (
            "RTT".to_string(),
            rtt_range(
                stats.min_rtt_ms,
                stats.avg_rtt_ms,
                stats.max_rtt_ms,
                u32::from(stats.received),
            ),
        ),
        (
            "Updated".to_string(),
            stats.last_update.format("%H:%M:%S").to_string().color(colors::SEPARATOR),
        ),
    ]
}

pub fn hop_line(record: &HopRecord) -> String {
    let hop = format!("{:>3}", record.hop).color(colors::ACCENT);
    let address = if record.success {
        format!("{:<16}", record.address).color(colors::IPV4_ADDR)
    } else {
        format!("{:<16}", record.address).color(colors::SEPARATOR)
    };
    let rtt = if record.success || record.rtt_ms > 0.0 {
        format!("{:>10}", rtt_ms(record.rtt_ms)).normal()
    } else {
        format!("{:>10}", "-").color(colors::SEPARATOR)
    };
    let status = if record.success { "ok".green() } else { "--".red() };
    format!("{hop}  {address} {rtt}  {status}")
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
