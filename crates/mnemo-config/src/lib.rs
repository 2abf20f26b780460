// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for Mnemo.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! XDG file hierarchy lookup, environment variable overrides, and Elm-style diagnostic
//! error rendering with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use mnemo_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("Listening on port {}", config.gateway.port);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{MemoryScope, MnemoConfig};

/// Validate a loaded config, or turn the load error into diagnostics.
///
/// `sources` supplies the raw TOML so diagnostics can point at the offending
/// key. It is only read when loading failed.
fn check(
    loaded: Result<MnemoConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<MnemoConfig, Vec<ConfigError>> {
    let config = loaded.map_err(|err| diagnostic::figment_to_config_errors(err, &sources()))?;
    validation::validate_config(&config)?;
    Ok(config)
}

/// Load configuration from the layered file hierarchy and validate it.
pub fn load_and_validate() -> Result<MnemoConfig, Vec<ConfigError>> {
    check(loader::load_config(), hierarchy_sources)
}

/// Load configuration from one explicit file and validate it.
pub fn load_and_validate_path(path: &std::path::Path) -> Result<MnemoConfig, Vec<ConfigError>> {
    check(loader::load_config_from_path(path), || {
        std::fs::read_to_string(path)
            .map(|content| vec![(path.display().to_string(), content)])
            .unwrap_or_default()
    })
}

/// Validate an inline TOML document.
pub fn load_and_validate_str(toml_content: &str) -> Result<MnemoConfig, Vec<ConfigError>> {
    check(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

/// Raw contents of every config file in the hierarchy that exists, local first.
fn hierarchy_sources() -> Vec<(String, String)> {
    let local = std::env::current_dir()
        .map(|d| d.join("mnemo.toml"))
        .unwrap_or_else(|_| "mnemo.toml".into());
    let user = dirs::config_dir().map(|d| d.join("mnemo").join("mnemo.toml"));
    let system = std::path::PathBuf::from("/etc/mnemo/mnemo.toml");

    [Some(local), user, Some(system)]
        .into_iter()
        .flatten()
        .filter_map(|path| {
            let content = std::fs::read_to_string(&path).ok()?;
            Some((path.display().to_string(), content))
        })
        .collect()
}
