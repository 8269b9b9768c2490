use once_cell::sync::Lazy;
use std::fmt;
use std::time::Instant;
use tracing_subscriber::fmt::time::FormatTime;

static START: Lazy<Instant> = Lazy::new(Instant::now);

/// Log timestamps as seconds since the CLI started.
pub struct UptimeSeconds;

impl FormatTime for UptimeSeconds {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> fmt::Result {
        let elapsed = START.elapsed();
        write!(w, "{:.3}s", elapsed.as_secs_f64())
    }
}

/// Shortens billing customer ids for logs: `cus_1234...wxyz`.
pub fn abbrev(s: &str) -> String {
    if s.chars().count() > 14 {
        let head: String = s.chars().take(8).collect();
        let tail: String = s
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("{}...{}", head, tail)
    } else {
        s.to_string()
    }
}
