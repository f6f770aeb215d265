//! Environment-driven settings and team `.env` files.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::context::MAX_HOURS_BACK;
use crate::error::ConfigError;

/// Config file used when neither `--config` nor `CONFIG_FILE` is given.
pub const DEFAULT_CONFIG_FILE: &str = "config.installers.json";

pub const CONFIG_FILE_ENV: &str = "CONFIG_FILE";
pub const HOURS_BACK_ENV: &str = "HOURS_BACK";
pub const PRODUCT_ENV: &str = "PRODUCT_SHORTNAME";
pub const DRY_RUN_ENV: &str = "DRY_RUN";

/// Team name from a config path: `config.installers.json` -> `installers`.
#[must_use]
pub fn team_name(config_path: &Path) -> Option<String> {
    let file_name = config_path.file_name()?.to_str()?;
    let team = file_name.strip_prefix("config.")?.strip_suffix(".json")?;
    (!team.is_empty()).then(|| team.to_string())
}

/// Config path for a team in `dir`.
#[must_use]
pub fn team_config_path(dir: &Path, team: &str) -> PathBuf {
    dir.join(format!("config.{team}.json"))
}

/// Load `.env.<team>` from `dir` if it exists.
///
/// Variables already set in the process win. Returns the file loaded.
pub fn load_team_env(dir: &Path, team: &str) -> Result<Option<PathBuf>, dotenvy::Error> {
    let env_file = dir.join(format!(".env.{team}"));
    if !env_file.is_file() {
        debug!(file = %env_file.display(), "Team environment file not found");
        return Ok(None);
    }
    dotenvy::from_path(&env_file)?;
    debug!(file = %env_file.display(), "Loaded team environment");
    Ok(Some(env_file))
}

/// Teams with a `config.<team>.json` in `dir`, sorted.
#[must_use]
pub fn discover_teams(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut teams: Vec<String> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| team_name(&entry.path()))
        .collect();
    teams.sort();
    teams
}

/// Config path from `CONFIG_FILE`, or the default.
#[must_use]
pub fn config_path() -> PathBuf {
    std::env::var(CONFIG_FILE_ENV)
        .ok()
        .filter(|v| !v.is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from)
}

/// `HOURS_BACK`, if set. Must be between 1 and [`MAX_HOURS_BACK`].
pub fn hours_back() -> Result<Option<u32>, ConfigError> {
    let Some(value) = std::env::var(HOURS_BACK_ENV).ok().filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    match value.trim().parse::<u32>() {
        Ok(hours) if (1..=MAX_HOURS_BACK).contains(&hours) => Ok(Some(hours)),
        _ => Err(ConfigError::InvalidEnv {
            var: HOURS_BACK_ENV,
            value,
        }),
    }
}

/// `PRODUCT_SHORTNAME`, if set.
#[must_use]
pub fn product() -> Option<String> {
    std::env::var(PRODUCT_ENV).ok().filter(|v| !v.trim().is_empty())
}

/// Whether a flag variable is set to anything but empty, `0` or `false`.
#[must_use]
pub fn flag(var: &str) -> bool {
    std::env::var(var).is_ok_and(|v| {
        let v = v.trim();
        !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_team_name() {
        assert_eq!(
            team_name(Path::new("config.installers.json")).as_deref(),
            Some("installers")
        );
        assert_eq!(
            team_name(Path::new("/etc/digest/config.platform-team.json")).as_deref(),
            Some("platform-team")
        );
        assert_eq!(team_name(Path::new("settings.json")), None);
        assert_eq!(team_name(Path::new("config..json")), None);
    }

    #[test]
    fn test_discover_teams() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["config.b.json", "config.a.json", "other.json", ".env.a"] {
            std::fs::write(dir.path().join(name), "{}").unwrap();
        }
        assert_eq!(discover_teams(dir.path()), vec!["a", "b"]);
    }

    #[test]
    #[serial]
    fn test_load_team_env() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".env.installers"),
            "SUPPORT_DIGEST_TEST_VALUE=from-team-file\n",
        )
        .unwrap();

        std::env::remove_var("SUPPORT_DIGEST_TEST_VALUE");
        let loaded = load_team_env(dir.path(), "installers").unwrap();
        assert!(loaded.is_some());
        assert_eq!(
            std::env::var("SUPPORT_DIGEST_TEST_VALUE").unwrap(),
            "from-team-file"
        );
        std::env::remove_var("SUPPORT_DIGEST_TEST_VALUE");

        assert!(load_team_env(dir.path(), "missing").unwrap().is_none());
    }

    #[test]
    #[serial]
    fn test_hours_back_env() {
        std::env::remove_var(HOURS_BACK_ENV);
        assert_eq!(hours_back().unwrap(), None);

        std::env::set_var(HOURS_BACK_ENV, "72");
        assert_eq!(hours_back().unwrap(), Some(72));

        std::env::set_var(HOURS_BACK_ENV, "0");
        assert!(matches!(
            hours_back(),
            Err(ConfigError::InvalidEnv { var: "HOURS_BACK", .. })
        ));

        std::env::set_var(HOURS_BACK_ENV, "yesterday");
        assert!(hours_back().is_err());

        std::env::set_var(HOURS_BACK_ENV, "3000000000");
        assert!(matches!(
            hours_back(),
            Err(ConfigError::InvalidEnv { var: "HOURS_BACK", .. })
        ));

        std::env::set_var(HOURS_BACK_ENV, MAX_HOURS_BACK.to_string());
        assert_eq!(hours_back().unwrap(), Some(MAX_HOURS_BACK));
        std::env::remove_var(HOURS_BACK_ENV);
    }

    #[test]
    #[serial]
    fn test_flag() {
        std::env::set_var(DRY_RUN_ENV, "1");
        assert!(flag(DRY_RUN_ENV));
        std::env::set_var(DRY_RUN_ENV, "false");
        assert!(!flag(DRY_RUN_ENV));
        std::env::remove_var(DRY_RUN_ENV);
        assert!(!flag(DRY_RUN_ENV));
    }
}
