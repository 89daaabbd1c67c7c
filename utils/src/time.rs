//! Duration formatting for log lines.

const UNITS: [(u64, &str); 4] = [(86_400, "d"), (3_600, "h"), (60, "m"), (1, "s")];

/// The two most significant units of `secs`: `"45s"`, `"5m"`, `"1h 30m"`,
/// `"2d 3h"`. A zero second unit is left out.
pub fn format_duration(secs: u64) -> String {
    let Some(i) = UNITS.iter().position(|(size, _)| secs >= *size) else {
        return "0s".to_string();
    };
    let (size, unit) = UNITS[i];
    let mut out = format!("{}{unit}", secs / size);
    if let Some((next, next_unit)) = UNITS.get(i + 1) {
        let n = (secs % size) / next;
        if n > 0 {
            out.push_str(&format!(" {n}{next_unit}"));
        }
    }
    out
}

/// `"in 5m"` or `"5m ago"` for an event at `then`, seen from `now`
/// (both in seconds since the epoch).
pub fn format_relative(now: u64, then: u64) -> String {
    if then >= now {
        format!("in {}", format_duration(then - now))
    } else {
        format!("{} ago", format_duration(now - then))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_two_largest_units() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(300), "5m");
        assert_eq!(format_duration(330), "5m 30s");
        assert_eq!(format_duration(3_660), "1h 1m");
        assert_eq!(format_duration(3_601), "1h");
        assert_eq!(format_duration(90_000), "1d 1h");
    }

    #[test]
    fn relative_direction() {
        assert_eq!(format_relative(1_000, 1_300), "in 5m");
        assert_eq!(format_relative(1_300, 1_000), "5m ago");
        assert_eq!(format_relative(1_000, 1_000), "in 0s");
    }
}
