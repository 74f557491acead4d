use crate::config::Config;
use log::{LevelFilter, info};
use std::env;
use std::path::PathBuf;

pub const URL_VAR: &str = "AGENDA_URL";
pub const ANON_KEY_VAR: &str = "AGENDA_ANON_KEY";
pub const LOG_LEVEL_VAR: &str = "AGENDA_LOG_LEVEL";

/// Loads `.env` from the working directory or its parents, if present.
/// Variables already set in the process keep their value. Runs before the
/// logger exists, so the outcome is returned for logging later.
pub fn load_env_file() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

pub fn log_env_file(loaded: Option<&PathBuf>) {
    match loaded {
        Some(path) => info!("Loaded environment from {:?}", path),
        None => info!("No .env file loaded"),
    }
}

/// Blank values count as unset.
pub fn get_env_var(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub fn apply_overrides(config: &mut Config) {
    config.apply_overrides(get_env_var);
}

pub fn log_level() -> Option<LevelFilter> {
    parse_level(&get_env_var(LOG_LEVEL_VAR)?)
}

fn parse_level(raw: &str) -> Option<LevelFilter> {
    raw.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("debug", Some(LevelFilter::Debug))]
    #[test_case("WARN", Some(LevelFilter::Warn))]
    #[test_case("off", Some(LevelFilter::Off))]
    #[test_case("loud", None)]
    fn test_parse_level(raw: &str, expected: Option<LevelFilter>) {
        assert_eq!(parse_level(raw), expected);
    }

    #[test]
    fn test_unset_variable_is_none() {
        assert_eq!(get_env_var("AGENDA_TEST_SURELY_UNSET_VARIABLE"), None);
    }
}
