//! Saved preferences and connection settings.
//!
//! Settings are layered with [`figment`]: built-in defaults, then the TOML
//! settings file, then `JIRA_PEEK_*` environment variables, then whatever
//! the command line overrides. They are read once at start-up.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::pipeline::QueryStyle;

pub const APP_NAME: &str = "jira-peek";
pub const SETTINGS_FILE: &str = "settings.toml";
pub const ENV_PREFIX: &str = "JIRA_PEEK_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Project searched by the JQL filter.
    pub project: String,
    /// User whose activity stream is shown.
    pub user: String,
    /// Base URL of the JIRA instance.
    pub host: String,
    /// Project key probed at start-up to check the session.
    pub probe_project: String,
    /// Raw `Cookie` header of an existing JIRA session.
    pub session_cookie: Option<String>,
    pub query_style: QueryStyle,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            project: "Sunshine".into(),
            user: "nyx.linden".into(),
            host: "https://jira.secondlife.com".into(),
            probe_project: "SUN".into(),
            session_cookie: None,
            query_style: QueryStyle::default(),
        }
    }
}

/// Values given on the command line. Unset fields leave lower layers alone.
#[derive(Debug, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_style: Option<QueryStyle>,
}

/// `JIRA_PEEK_*` variables as raw strings. Every setting is text, and
/// figment's `Env` would parse `JIRA_PEEK_PROJECT=2024` into a number.
fn env_layer() -> Serialized<BTreeMap<String, String>> {
    let vars = Env::prefixed(ENV_PREFIX)
        .iter()
        .map(|(key, value)| (key.into_string(), value))
        .collect();
    Serialized::defaults(vars)
}

impl Settings {
    /// Defaults and the settings file.
    fn stored(path: Option<&Path>) -> Figment {
        let figment = Figment::from(Serialized::defaults(Settings::default()));
        match path {
            Some(path) => figment.merge(Toml::file(path)),
            None => figment,
        }
    }

    pub fn figment(path: Option<&Path>, overrides: &Overrides) -> Figment {
        Self::stored(path)
            .merge(env_layer())
            .merge(Serialized::defaults(overrides))
    }

    pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Self, figment::Error> {
        Self::figment(path, overrides).extract()
    }

    /// The settings `config` writes back: the file plus explicit
    /// command-line values. Environment variables are left out so they never
    /// leak into the file.
    pub fn load_stored(path: Option<&Path>, overrides: &Overrides) -> Result<Self, figment::Error> {
        Self::stored(path)
            .merge(Serialized::defaults(overrides))
            .extract()
    }

    /// Write the settings file, creating its directory if needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        let text = toml::to_string_pretty(self).context("serializing settings")?;
        fs::write(path, text).with_context(|| format!("writing {}", path.display()))
    }
}

/// An existing settings file on the XDG config path, else where
/// `$XDG_CONFIG_HOME/jira-peek/settings.toml` would go. Creates nothing.
pub fn default_path() -> Option<PathBuf> {
    let dirs = xdg::BaseDirectories::with_prefix(APP_NAME).ok()?;
    Some(
        dirs.find_config_file(SETTINGS_FILE)
            .unwrap_or_else(|| dirs.get_config_file(SETTINGS_FILE)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_match_the_saved_preference_defaults() {
        let s = Settings::default();
        assert_eq!(s.project, "Sunshine");
        assert_eq!(s.user, "nyx.linden");
        assert_eq!(s.probe_project, "SUN");
        assert_eq!(s.query_style, QueryStyle::Hardened);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        Jail::expect_with(|_| {
            let s = Settings::load(Some(Path::new("nope.toml")), &Overrides::default())?;
            assert_eq!(s, Settings::default());
            Ok(())
        });
    }

    #[test]
    fn file_then_env_then_overrides() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "settings.toml",
                r#"
                    project = "Moonshine"
                    user = "file.user"
                    query_style = "legacy"
                "#,
            )?;
            jail.set_env("JIRA_PEEK_USER", "env.user");
            jail.set_env("JIRA_PEEK_HOST", "https://jira.example.com");

            let overrides = Overrides {
                host: Some("https://override.example.com".into()),
                ..Overrides::default()
            };
            let s = Settings::load(Some(Path::new("settings.toml")), &overrides)?;

            assert_eq!(s.project, "Moonshine");
            assert_eq!(s.user, "env.user");
            assert_eq!(s.host, "https://override.example.com");
            assert_eq!(s.query_style, QueryStyle::Legacy);
            assert_eq!(s.probe_project, "SUN");
            Ok(())
        });
    }

    #[test]
    fn numeric_env_values_stay_text() {
        Jail::expect_with(|jail| {
            jail.set_env("JIRA_PEEK_PROJECT", "2024");
            jail.set_env("JIRA_PEEK_PROBE_PROJECT", "007");
            jail.set_env("JIRA_PEEK_QUERY_STYLE", "legacy");

            let s = Settings::load(None, &Overrides::default())?;
            assert_eq!(s.project, "2024");
            assert_eq!(s.probe_project, "007");
            assert_eq!(s.query_style, QueryStyle::Legacy);
            Ok(())
        });
    }

    #[test]
    fn stored_settings_ignore_the_environment() {
        Jail::expect_with(|jail| {
            jail.create_file("settings.toml", r#"project = "Moonshine""#)?;
            jail.set_env("JIRA_PEEK_SESSION_COOKIE", "JSESSIONID=env");
            jail.set_env("JIRA_PEEK_HOST", "https://jira.example.com");

            let overrides = Overrides {
                user: Some("cli.user".into()),
                ..Overrides::default()
            };
            let s = Settings::load_stored(Some(Path::new("settings.toml")), &overrides)?;

            assert_eq!(s.project, "Moonshine");
            assert_eq!(s.user, "cli.user");
            assert_eq!(s.session_cookie, None);
            assert_eq!(s.host, Settings::default().host);
            Ok(())
        });
    }

    #[test]
    fn default_path_creates_no_directories() {
        Jail::expect_with(|jail| {
            let home = jail.directory().join("config");
            jail.set_env("XDG_CONFIG_HOME", home.display());

            let path = default_path().ok_or("no default path")?;
            assert_eq!(path, home.join(APP_NAME).join(SETTINGS_FILE));
            assert!(!home.exists());
            Ok(())
        });
    }

    #[test]
    fn save_round_trips_through_load() {
        Jail::expect_with(|jail| {
            let path = jail.directory().join("nested").join(SETTINGS_FILE);
            let saved = Settings {
                project: "Moonshine".into(),
                session_cookie: Some("JSESSIONID=abc".into()),
                ..Settings::default()
            };
            saved.save(&path).map_err(|e| e.to_string())?;

            let loaded = Settings::load(Some(&path), &Overrides::default())?;
            assert_eq!(loaded, saved);
            Ok(())
        });
    }
}
