//! Time formatting helpers.

const NANOS_PER_MILLI: i128 = 1_000_000;
const NANOS_PER_SEC: i128 = 1_000_000_000;

/// Format a window width given in nanoseconds as a short human-readable string.
pub fn format_window(nanos: i128) -> String {
    if nanos < NANOS_PER_MILLI {
        return format!("{nanos}ns");
    }
    if nanos < NANOS_PER_SEC {
        return format!("{}ms", nanos / NANOS_PER_MILLI);
    }
    let secs = nanos / NANOS_PER_SEC;
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}
