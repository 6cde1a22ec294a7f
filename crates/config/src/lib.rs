//! Configuration loading, env substitution and validation.
//!
//! Config files: `freshet.toml`, `freshet.yaml`, `freshet.yml` or
//! `freshet.json`, searched in `./` then the user config directory
//! (`~/.config/freshet/` on Linux).
//!
//! `${ENV_VAR}` and `${ENV_VAR:-fallback}` placeholders are replaced before
//! the file is parsed.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{
        CONFIG_FILENAMES, LoadedConfig, config_dir, discover_and_load, find_config_file,
        load_config, render_toml,
    },
    schema::{FeedConfig, FreshetConfig, IrcServerConfig, OutputConfig, OutputFormat, RunConfig},
    validate::{Diagnostic, Severity, has_errors, validate},
};
