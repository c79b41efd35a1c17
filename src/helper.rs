#[inline(always)]
pub fn default_true() -> bool {
    true
}

/// Current unix timestamp, in seconds.
pub fn now() -> i64 {
    let delta = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    delta.as_secs() as i64
}
