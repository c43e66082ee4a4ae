//! Human-readable byte counts and rates (decimal units).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Range {
    Byte,
    Kilo,
    Mega,
    Giga,
}

impl Range {
    fn of(value: f64) -> Self {
        if value < 1e3 {
            Range::Byte
        } else if value < 1e6 {
            Range::Kilo
        } else if value < 1e9 {
            Range::Mega
        } else {
            Range::Giga
        }
    }

    fn bytes_label(self) -> &'static str {
        match self {
            Range::Byte => "bytes",
            Range::Kilo => "KB",
            Range::Mega => "MB",
            Range::Giga => "GB",
        }
    }

    fn rate_label(self) -> &'static str {
        match self {
            Range::Byte => "bps",
            Range::Kilo => "Kbps",
            Range::Mega => "Mbps",
            Range::Giga => "Gbps",
        }
    }

    fn format(self, value: f64) -> String {
        match self {
            Range::Byte => format!("{value:.0}"),
            Range::Kilo => format!("{:.2}", value / 1e3),
            Range::Mega => format!("{:.2}", value / 1e6),
            Range::Giga => format!("{:.2}", value / 1e9),
        }
    }
}

/// Formats `value` against `total`, both in the unit chosen by `total`,
/// e.g. `"1.50 / 3.00 MB"`.
pub fn format_bytes_amount(value: u64, total: u64) -> String {
    let range = Range::of(total as f64);
    format!(
        "{} / {} {}",
        range.format(value as f64),
        range.format(total as f64),
        range.bytes_label()
    )
}

/// Formats a bits-per-second rate, e.g. `"53.33 Kbps"`.
pub fn format_bps_rate(bits_per_second: f64) -> String {
    let range = Range::of(bits_per_second);
    format!("{} {}", range.format(bits_per_second), range.rate_label())
}
