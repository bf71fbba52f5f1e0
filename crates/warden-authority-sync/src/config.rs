// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered client configuration: defaults, then a TOML file, then `WARDEN_*`
//! environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};
use url::Url;
use warden_authority_core::AuthorityId;

use crate::error::ConfigError;
use crate::sequence::SequencingPolicy;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_READ_ATTEMPTS: u32 = 3;
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SyncConfigLayer {
	pub base_url: Option<String>,
	pub auth_token: Option<String>,
	pub request_timeout_secs: Option<u64>,
	pub max_read_attempts: Option<u32>,
	pub sequencing: Option<SequencingPolicy>,
	pub log_level: Option<String>,
	pub actor_authority_id: Option<AuthorityId>,
}

impl SyncConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.base_url.is_some() {
			self.base_url = other.base_url;
		}
		if other.auth_token.is_some() {
			self.auth_token = other.auth_token;
		}
		if other.request_timeout_secs.is_some() {
			self.request_timeout_secs = other.request_timeout_secs;
		}
		if other.max_read_attempts.is_some() {
			self.max_read_attempts = other.max_read_attempts;
		}
		if other.sequencing.is_some() {
			self.sequencing = other.sequencing;
		}
		if other.log_level.is_some() {
			self.log_level = other.log_level;
		}
		if other.actor_authority_id.is_some() {
			self.actor_authority_id = other.actor_authority_id;
		}
	}

	pub fn finalize(self) -> Result<SyncConfig, ConfigError> {
		let raw_url = self
			.base_url
			.ok_or_else(|| ConfigError::MissingField("base_url".to_string()))?;
		let base_url = Url::parse(&raw_url).map_err(|e| ConfigError::InvalidValue {
			key: "base_url".to_string(),
			message: format!("'{raw_url}': {e}"),
		})?;
		if !matches!(base_url.scheme(), "http" | "https") {
			return Err(ConfigError::InvalidValue {
				key: "base_url".to_string(),
				message: format!("unsupported scheme '{}'", base_url.scheme()),
			});
		}

		let timeout_secs = self
			.request_timeout_secs
			.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
		if timeout_secs == 0 {
			return Err(ConfigError::InvalidValue {
				key: "request_timeout_secs".to_string(),
				message: "must be greater than zero".to_string(),
			});
		}

		let max_read_attempts = self.max_read_attempts.unwrap_or(DEFAULT_MAX_READ_ATTEMPTS);
		if max_read_attempts == 0 {
			return Err(ConfigError::InvalidValue {
				key: "max_read_attempts".to_string(),
				message: "must be at least 1".to_string(),
			});
		}

		Ok(SyncConfig {
			base_url,
			auth_token: self.auth_token.filter(|t| !t.is_empty()),
			request_timeout: Duration::from_secs(timeout_secs),
			max_read_attempts,
			sequencing: self.sequencing.unwrap_or_default(),
			log_level: self
				.log_level
				.unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
			actor_authority_id: self.actor_authority_id,
		})
	}
}

/// Fully resolved client configuration.
#[derive(Clone, PartialEq)]
pub struct SyncConfig {
	pub base_url: Url,
	pub auth_token: Option<String>,
	pub request_timeout: Duration,
	pub max_read_attempts: u32,
	pub sequencing: SequencingPolicy,
	pub log_level: String,
	/// Authority whose grants bound what this client may grant.
	pub actor_authority_id: Option<AuthorityId>,
}

impl std::fmt::Debug for SyncConfig {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SyncConfig")
			.field("base_url", &self.base_url.as_str())
			.field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
			.field("request_timeout", &self.request_timeout)
			.field("max_read_attempts", &self.max_read_attempts)
			.field("sequencing", &self.sequencing)
			.field("log_level", &self.log_level)
			.field("actor_authority_id", &self.actor_authority_id)
			.finish()
	}
}

/// Source precedence levels (higher overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<SyncConfigLayer, ConfigError>;
}

pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<SyncConfigLayer, ConfigError> {
		Ok(SyncConfigLayer {
			request_timeout_secs: Some(DEFAULT_REQUEST_TIMEOUT_SECS),
			max_read_attempts: Some(DEFAULT_MAX_READ_ATTEMPTS),
			sequencing: Some(SequencingPolicy::default()),
			log_level: Some(DEFAULT_LOG_LEVEL.to_string()),
			..Default::default()
		})
	}
}

/// TOML file source. A missing file contributes nothing.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// `$XDG_CONFIG_HOME/warden/authority.toml`, if a config directory exists.
	pub fn user() -> Option<Self> {
		default_config_path().map(Self::new)
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<SyncConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(SyncConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: SyncConfigLayer = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Environment variable source.
///
/// Convention: WARDEN_<FIELD>
pub struct EnvSource {
	lookup: EnvLookup,
}

impl EnvSource {
	pub fn new() -> Self {
		Self::with_lookup(|name| std::env::var(name).ok())
	}

	/// Reads variables through `lookup` instead of the process environment.
	pub fn with_lookup(lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
		Self {
			lookup: Box::new(lookup),
		}
	}

	fn var(&self, name: &str) -> Option<String> {
		(self.lookup)(name).filter(|s| !s.is_empty())
	}

	fn parsed<T>(&self, name: &str) -> Result<Option<T>, ConfigError>
	where
		T: std::str::FromStr,
		T::Err: std::fmt::Display,
	{
		match self.var(name) {
			Some(v) => v.parse().map(Some).map_err(|e| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("'{v}': {e}"),
			}),
			None => Ok(None),
		}
	}
}

impl Default for EnvSource {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<SyncConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(SyncConfigLayer {
			base_url: self.var("WARDEN_BASE_URL"),
			auth_token: self.var("WARDEN_AUTH_TOKEN"),
			request_timeout_secs: self.parsed("WARDEN_REQUEST_TIMEOUT_SECS")?,
			max_read_attempts: self.parsed("WARDEN_MAX_READ_ATTEMPTS")?,
			sequencing: self.parsed("WARDEN_SEQUENCING")?,
			log_level: self.var("WARDEN_LOG_LEVEL"),
			actor_authority_id: self.parsed("WARDEN_ACTOR_AUTHORITY_ID")?,
		})
	}
}

pub fn default_config_path() -> Option<PathBuf> {
	dirs::config_dir().map(|dir| dir.join("warden").join("authority.toml"))
}

/// Merges `sources` in precedence order and finalizes the result.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<SyncConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = SyncConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	let config = merged.finalize()?;
	info!(
		base_url = %config.base_url,
		sequencing = %config.sequencing,
		timeout_secs = config.request_timeout.as_secs(),
		actor_authority_id = ?config.actor_authority_id,
		"client configuration loaded"
	);
	Ok(config)
}

/// Loads configuration from defaults, the TOML file at `path` (or the user
/// config file), and the environment.
pub fn load_config(path: Option<&Path>) -> Result<SyncConfig, ConfigError> {
	let mut sources: Vec<Box<dyn ConfigSource>> = vec![Box::new(DefaultsSource)];
	match path {
		Some(path) => sources.push(Box::new(TomlSource::new(path))),
		None => {
			if let Some(source) = TomlSource::user() {
				sources.push(Box::new(source));
			}
		}
	}
	sources.push(Box::new(EnvSource::new()));

	load_from_sources(sources)
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use super::*;

	fn env(vars: &[(&str, &str)]) -> EnvSource {
		let vars: HashMap<String, String> = vars
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		EnvSource::with_lookup(move |name| vars.get(name).cloned())
	}

	#[test]
	fn test_merge_overwrites_only_set_fields() {
		let mut base = SyncConfigLayer {
			base_url: Some("http://a.example".to_string()),
			request_timeout_secs: Some(10),
			..Default::default()
		};
		base.merge(SyncConfigLayer {
			base_url: Some("http://b.example".to_string()),
			..Default::default()
		});

		assert_eq!(base.base_url.as_deref(), Some("http://b.example"));
		assert_eq!(base.request_timeout_secs, Some(10));
	}

	#[test]
	fn test_finalize_requires_base_url() {
		let err = SyncConfigLayer::default().finalize().unwrap_err();
		assert!(matches!(err, ConfigError::MissingField(field) if field == "base_url"));
	}

	#[test]
	fn test_finalize_rejects_bad_url() {
		let layer = SyncConfigLayer {
			base_url: Some("ftp://store.example".to_string()),
			..Default::default()
		};
		assert!(matches!(
			layer.finalize(),
			Err(ConfigError::InvalidValue { key, .. }) if key == "base_url"
		));
	}

	#[test]
	fn test_finalize_defaults() {
		let config = SyncConfigLayer {
			base_url: Some("https://store.example/api/".to_string()),
			auth_token: Some(String::new()),
			..Default::default()
		}
		.finalize()
		.unwrap();

		assert_eq!(config.request_timeout, Duration::from_secs(30));
		assert_eq!(config.max_read_attempts, 3);
		assert_eq!(config.sequencing, SequencingPolicy::Global);
		assert_eq!(config.log_level, "info");
		assert_eq!(config.auth_token, None);
		assert_eq!(config.actor_authority_id, None);
	}

	#[test]
	fn test_debug_redacts_token() {
		let config = SyncConfigLayer {
			base_url: Some("https://store.example".to_string()),
			auth_token: Some("s3cret".to_string()),
			..Default::default()
		}
		.finalize()
		.unwrap();

		let debug = format!("{config:?}");
		assert!(!debug.contains("s3cret"));
		assert!(debug.contains("[REDACTED]"));
	}

	#[test]
	fn test_env_source_parses_values() {
		let layer = env(&[
			("WARDEN_BASE_URL", "https://store.example"),
			("WARDEN_REQUEST_TIMEOUT_SECS", "5"),
			("WARDEN_SEQUENCING", "per-node"),
			("WARDEN_ACTOR_AUTHORITY_ID", "12"),
			("WARDEN_LOG_LEVEL", ""),
		])
		.load()
		.unwrap();

		assert_eq!(layer.base_url.as_deref(), Some("https://store.example"));
		assert_eq!(layer.request_timeout_secs, Some(5));
		assert_eq!(layer.sequencing, Some(SequencingPolicy::PerNode));
		assert_eq!(layer.actor_authority_id, Some(AuthorityId::new(12)));
		assert_eq!(layer.log_level, None);
	}

	#[test]
	fn test_env_source_rejects_garbage() {
		let err = env(&[("WARDEN_REQUEST_TIMEOUT_SECS", "soon")])
			.load()
			.unwrap_err();
		assert!(matches!(
			err,
			ConfigError::InvalidValue { key, .. } if key == "WARDEN_REQUEST_TIMEOUT_SECS"
		));
	}

	#[test]
	fn test_toml_source_missing_file_is_empty() {
		let dir = tempfile::tempdir().unwrap();
		let layer = TomlSource::new(dir.path().join("absent.toml"))
			.load()
			.unwrap();
		assert_eq!(layer, SyncConfigLayer::default());
	}

	#[test]
	fn test_toml_source_parse_error() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("authority.toml");
		std::fs::write(&path, "request_timeout_secs = \"ten\"").unwrap();

		assert!(matches!(
			TomlSource::new(&path).load(),
			Err(ConfigError::TomlParse { .. })
		));
	}

	#[test]
	fn test_environment_overrides_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("authority.toml");
		std::fs::write(
			&path,
			r#"
base_url = "https://file.example"
request_timeout_secs = 12
sequencing = "per_node"
actor_authority_id = 4
"#,
		)
		.unwrap();

		let sources: Vec<Box<dyn ConfigSource>> = vec![
			Box::new(env(&[("WARDEN_BASE_URL", "https://env.example")])),
			Box::new(TomlSource::new(&path)),
			Box::new(DefaultsSource),
		];
		let config = load_from_sources(sources).unwrap();

		assert_eq!(config.base_url.as_str(), "https://env.example/");
		assert_eq!(config.request_timeout, Duration::from_secs(12));
		assert_eq!(config.sequencing, SequencingPolicy::PerNode);
		assert_eq!(config.actor_authority_id, Some(AuthorityId::new(4)));
		assert_eq!(config.max_read_attempts, 3);
	}
}
