use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::FreshetConfig,
};

/// Standard config file names, checked in order.
pub const CONFIG_FILENAMES: &[&str] = &[
    "freshet.toml",
    "freshet.yaml",
    "freshet.yml",
    "freshet.json",
];

/// A parsed config together with the file it came from.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub config: FreshetConfig,
    /// `None` when no file was found and defaults are in effect.
    pub path: Option<PathBuf>,
}

/// Load config from `path`. The format follows the file extension.
pub fn load_config(path: &Path) -> Result<FreshetConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&substitute_env(&raw), path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./freshet.{toml,yaml,yml,json}`
/// 2. `<user config dir>/freshet.{toml,yaml,yml,json}`
///
/// Defaults are returned when no file exists. A file that exists but does
/// not parse is an error.
pub fn discover_and_load() -> Result<LoadedConfig> {
    let Some(path) = find_config_file() else {
        debug!("no config file found, using defaults");
        return Ok(LoadedConfig::default());
    };
    debug!(path = %path.display(), "loading config");
    let config = load_config(&path)?;
    Ok(LoadedConfig {
        config,
        path: Some(path),
    })
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    find_in(Path::new(".")).or_else(|| config_dir().and_then(|dir| find_in(&dir)))
}

/// Returns the user-global config directory (`~/.config/freshet/` on Linux).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "freshet").map(|d| d.config_dir().to_path_buf())
}

/// Render `config` as TOML. The IRC password is redacted.
pub fn render_toml(config: &FreshetConfig) -> Result<String> {
    Ok(toml::to_string_pretty(config)?)
}

fn find_in(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

fn parse_config(raw: &str, path: &Path) -> Result<FreshetConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
    let path = path.to_path_buf();

    match ext {
        "toml" => toml::from_str(raw).map_err(|source| Error::Toml { path, source }),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|source| Error::Yaml { path, source }),
        "json" => serde_json::from_str(raw).map_err(|source| Error::Json { path, source }),
        other => Err(Error::UnsupportedFormat {
            ext: other.to_owned(),
            path,
        }),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::fs;

    use {rstest::rstest, secrecy::ExposeSecret};

    use {super::*, crate::schema::OutputFormat};

    #[rstest]
    #[case("freshet.toml", "[irc]\nport = 7000\n[output]\nformat = \"jsonl\"\n")]
    #[case("freshet.yaml", "irc:\n  port: 7000\noutput:\n  format: jsonl\n")]
    #[case("freshet.yml", "irc:\n  port: 7000\noutput:\n  format: jsonl\n")]
    #[case("freshet.json", r#"{"irc": {"port": 7000}, "output": {"format": "jsonl"}}"#)]
    fn loads_every_supported_format(#[case] name: &str, #[case] body: &str) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.irc.port, 7000);
        assert_eq!(cfg.output.format, OutputFormat::Jsonl);
        assert_eq!(cfg.irc.host, "irc.wikimedia.org");
    }

    #[test]
    fn placeholders_use_their_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("freshet.toml");
        fs::write(
            &path,
            "[irc]\npassword = \"${FRESHET_TEST_UNSET_PASSWORD:-s3cret}\"\n",
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.irc.password.unwrap().expose_secret(), "s3cret");
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("freshet.ini");
        fs::write(&path, "port=1").unwrap();
        assert!(matches!(
            load_config(&path),
            Err(Error::UnsupportedFormat { ref ext, .. }) if ext == "ini"
        ));
    }

    #[test]
    fn syntax_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("freshet.toml");
        fs::write(&path, "[irc\nport = ").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, Error::Toml { .. }));
        assert!(err.to_string().contains("freshet.toml"));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_config(&dir.path().join("freshet.toml")),
            Err(Error::Read { .. })
        ));
    }

    #[test]
    fn find_in_prefers_toml() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_in(dir.path()).is_none());

        fs::write(dir.path().join("freshet.json"), "{}").unwrap();
        assert_eq!(find_in(dir.path()).unwrap(), dir.path().join("freshet.json"));

        fs::write(dir.path().join("freshet.toml"), "").unwrap();
        assert_eq!(find_in(dir.path()).unwrap(), dir.path().join("freshet.toml"));
    }

    #[test]
    fn rendered_toml_loads_back() {
        let mut cfg = FreshetConfig::default();
        cfg.feed.channels.push("#de.wikipedia".into());
        cfg.run.duration_secs = Some(60);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("freshet.toml");
        fs::write(&path, render_toml(&cfg).unwrap()).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.feed.channels, cfg.feed.channels);
        assert_eq!(loaded.run.duration_secs, Some(60));
    }
}
