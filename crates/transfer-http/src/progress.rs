//! Percentage helpers matching the way the console reports transfer progress

/// Download progress: `round(loaded / total * 100)`, capped at 100.
///
/// An unknown (zero) total reports 0 instead of dividing by zero.
pub fn percent_rounded(loaded: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    let percent = ((loaded as f64 / total as f64) * 100.0).round() as u32;
    std::cmp::min(percent, 100)
}

/// Upload progress: `floor(loaded * 100 / total)`, capped at 100.
pub fn percent_floor(loaded: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    let percent = (loaded as u128 * 100 / total as u128) as u32;
    std::cmp::min(percent, 100)
}
