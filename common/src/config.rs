//! Process-wide settings (§6): `config.yaml`/`config.json`, command-line
//! flags override. Grounded on the config-loading style of
//! `MarkWells-Dev-Catenary/src/config.rs`, generalized from `toml` to
//! `yaml`/`json` as spec.md names.

use serde::Deserialize;
use std::path::PathBuf;

use crate::error::DocsError;

#[derive(Debug, Deserialize, Clone)]
pub struct NmConfig {
    #[serde(default = "default_nm_host")]
    pub host: String,
    #[serde(default = "default_nm_port")]
    pub port: u16,
    #[serde(default = "default_ss_registration_port")]
    pub ss_port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,
    #[serde(default)]
    pub allow_unsafe_exec: bool,
    #[serde(default = "default_ss_liveness_secs")]
    pub ss_liveness_secs: u64,
}

impl Default for NmConfig {
    fn default() -> Self {
        Self {
            host: default_nm_host(),
            port: default_nm_port(),
            ss_port: default_ss_registration_port(),
            data_dir: default_data_dir(),
            catalog_path: default_catalog_path(),
            allow_unsafe_exec: false,
            ss_liveness_secs: default_ss_liveness_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SsConfig {
    #[serde(default = "default_ss_host")]
    pub host: String,
    #[serde(default = "default_ss_client_port")]
    pub client_port: u16,
    #[serde(default = "default_ss_admin_port")]
    pub admin_port: u16,
    #[serde(default = "default_nm_host")]
    pub nm_host: String,
    #[serde(default = "default_ss_registration_port")]
    pub nm_port: u16,
    #[serde(default = "default_ss_id")]
    pub ss_id: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for SsConfig {
    fn default() -> Self {
        Self {
            host: default_ss_host(),
            client_port: default_ss_client_port(),
            admin_port: default_ss_admin_port(),
            nm_host: default_nm_host(),
            nm_port: default_ss_registration_port(),
            ss_id: default_ss_id(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_nm_host() -> String {
    "127.0.0.1".to_string()
}
fn default_nm_port() -> u16 {
    7000
}
fn default_ss_registration_port() -> u16 {
    7001
}
fn default_ss_host() -> String {
    "127.0.0.1".to_string()
}
fn default_ss_client_port() -> u16 {
    8000
}
fn default_ss_admin_port() -> u16 {
    8001
}
fn default_ss_id() -> String {
    "ss1".to_string()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_catalog_path() -> PathBuf {
    PathBuf::from("nm/metadata.dat")
}
fn default_ss_liveness_secs() -> u64 {
    30
}

/// Load a config struct from an optional `config.yaml`/`config.json` file,
/// falling back to defaults. CLI flags are applied by the caller afterward
/// (they always win, per §6).
pub fn load<T>(explicit_file: Option<&PathBuf>) -> Result<T, DocsError>
where
    T: Default + for<'de> Deserialize<'de>,
{
    let mut builder = config::Config::builder();

    let candidates: Vec<PathBuf> = if let Some(p) = explicit_file {
        vec![p.clone()]
    } else {
        vec![PathBuf::from("config.yaml"), PathBuf::from("config.json")]
    };

    let mut any_found = false;
    for path in &candidates {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()));
            any_found = true;
        }
    }

    if !any_found {
        return Ok(T::default());
    }

    let built = builder.build().map_err(|_| DocsError::SystemError)?;
    built.try_deserialize().map_err(|_| DocsError::SystemError)
}
