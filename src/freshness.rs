use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use crate::error::MetaprepError;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

pub fn is_stale(path: &Path, max_age_days: u64) -> Result<bool, MetaprepError> {
    if !path.exists() {
        return Err(MetaprepError::FileNotFound(path.to_path_buf()));
    }
    let metadata = fs::metadata(path).map_err(|err| MetaprepError::Filesystem(err.to_string()))?;
    let modified = metadata
        .modified()
        .map_err(|err| MetaprepError::Filesystem(err.to_string()))?;
    Ok(is_stale_at(modified, SystemTime::now(), max_age_days))
}

fn is_stale_at(modified: SystemTime, now: SystemTime, max_age_days: u64) -> bool {
    let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
    age > Duration::from_secs(max_age_days * SECONDS_PER_DAY)
}
