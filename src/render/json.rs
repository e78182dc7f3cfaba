use serde::Serialize;

use crate::error::TrialWatchError;

pub fn to_pretty<T: Serialize>(value: &T) -> Result<String, TrialWatchError> {
    Ok(serde_json::to_string_pretty(value)?)
}
