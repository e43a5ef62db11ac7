//! Environment variable helpers shared by the config loaders.

use std::str::FromStr;

/// Load a `.env` file if present. Missing files are not an error.
pub(crate) fn load_dotenv() {
    // Missing .env is the common case in production.
    let _ = dotenvy::dotenv();
}

/// Parse `key` from the environment. `Ok(None)` if it is unset.
pub(crate) fn parse_var<T>(key: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| format!("{key}: {e}")),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(format!("{key}: {e}")),
    }
}
