/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a Snowflake-style i64 for use as row ID.
///
/// Layout (53 bits, fits in JavaScript's Number.MAX_SAFE_INTEGER):
///   - 41 bits: milliseconds since 2024-01-01 UTC (~69 years)
///   - 12 bits: random (4096 values per ms)
pub fn snowflake_id() -> i64 {
    use rand::Rng;
    // Custom epoch: 2024-01-01 00:00:00 UTC
    const EPOCH_MS: i64 = 1_704_067_200_000;
    let now = now_millis();
    let ts = (now - EPOCH_MS) & 0x1FF_FFFF_FFFF; // 41 bits
    let rand_bits: i64 = rand::thread_rng().gen_range(0..0x1000); // 12 bits
    (ts << 12) | rand_bits
}

/// Format epoch millis as `DD/MM/YYYY HH:MM:SS` in Brasilia time (UTC-3, no DST)
pub fn format_br_datetime(millis: i64) -> String {
    let Some(dt) = chrono::DateTime::from_timestamp_millis(millis) else {
        return millis.to_string();
    };
    match chrono::FixedOffset::west_opt(3 * 3600) {
        Some(offset) => dt.with_timezone(&offset).format("%d/%m/%Y %H:%M:%S").to_string(),
        None => dt.format("%d/%m/%Y %H:%M:%S").to_string(),
    }
}
