use std::time::{SystemTime, UNIX_EPOCH};

pub(super) fn now_ms() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    now as u64
}

/// Scheduler clock and stored best times are in seconds.
pub(super) fn ms_to_sec(ms: u64) -> f32 {
    (ms as f64 / 1000.0) as f32
}
