use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::workflows::listings::UserId;

const SUFFIX_LEN: usize = 8;

/// Object key `{user}/{unix_millis}-{random}.{ext}`.
pub fn object_key(user: &UserId, at: DateTime<Utc>, extension: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|byte| char::from(byte).to_ascii_lowercase())
        .collect();

    format!(
        "{user}/{millis}-{suffix}.{ext}",
        millis = at.timestamp_millis(),
        ext = extension.trim_start_matches('.').to_ascii_lowercase()
    )
}
