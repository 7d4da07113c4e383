//! Tool configuration
//!
//! Persistent settings live in the platform-specific config folder:
//! - Linux: ~/.config/kms-vault/config.json
//! - Windows: %APPDATA%/kms-vault/config.json
//! - macOS: ~/Library/Application Support/kms-vault/config.json
//!
//! Every setting resolves in layers: a command-line flag beats the
//! matching `KMS_VAULT_*` environment variable, which beats the config
//! file, which beats the built-in default.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::aws::types::ObjectRef;
use crate::aws::AwsSettings;
use crate::cli::{AwsOpts, PipelineOpts};
use crate::files::PathSet;

pub const ENV_KEY_ID: &str = "KMS_VAULT_KEY_ID";
pub const ENV_BUCKET: &str = "KMS_VAULT_BUCKET";
pub const ENV_REGION: &str = "KMS_VAULT_REGION";
pub const ENV_OBJECT_KEY: &str = "KMS_VAULT_OBJECT_KEY";

/// Object key the ciphertext is stored under when none is configured.
pub const DEFAULT_OBJECT_KEY: &str = "encrypted";

/// Settings that persist between runs. Every field is optional so a
/// partial config file works.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// AWS profile name from the shared config files
    #[serde(default)]
    pub profile: Option<String>,

    /// AWS region override
    #[serde(default)]
    pub region: Option<String>,

    /// Custom service endpoint (LocalStack, MinIO)
    #[serde(default)]
    pub endpoint_url: Option<String>,

    /// Use path-style S3 addressing
    #[serde(default)]
    pub force_path_style: bool,

    /// KMS key id or ARN used to encrypt
    #[serde(default)]
    pub key_id: Option<String>,

    /// Bucket holding the ciphertext object
    #[serde(default)]
    pub bucket: Option<String>,

    /// Object key the ciphertext is stored under
    #[serde(default)]
    pub object_key: Option<String>,

    /// Path of the plaintext source file
    #[serde(default)]
    pub plaintext_path: Option<PathBuf>,

    /// Path the ciphertext is staged at before upload
    #[serde(default)]
    pub encrypted_path: Option<PathBuf>,

    /// Path the downloaded blob is written to
    #[serde(default)]
    pub downloaded_path: Option<PathBuf>,

    /// Path the decrypted output is written to
    #[serde(default)]
    pub decrypted_path: Option<PathBuf>,
}

impl Config {
    /// Load the config from disk, returning defaults if no file exists
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load the config from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        let config: Config = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {:?}", path))?;

        tracing::debug!("Loaded config from {:?}", path);

        Ok(config)
    }

    /// Write a default config file unless one already exists, returning
    /// its path either way
    pub fn write_default_if_missing() -> Result<PathBuf> {
        let path = Self::config_path()?;
        if path.exists() {
            return Ok(path);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let contents =
            serde_json::to_string_pretty(&Self::default()).context("Failed to serialize config")?;

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        tracing::debug!("Wrote default config to {:?}", path);

        Ok(path)
    }

    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "kms-vault", "kms-vault")
            .context("Failed to determine config directory")?;

        Ok(proj_dirs.config_dir().join("config.json"))
    }
}

/// Fully resolved settings for the pipeline commands.
#[derive(Debug, Clone, PartialEq)]
pub struct VaultSettings {
    pub key_id: String,
    pub object: ObjectRef,
    pub paths: PathSet,
}

/// Resolve connection settings from flags, environment and config file.
pub fn resolve_aws(config: &Config, opts: &AwsOpts) -> AwsSettings {
    AwsSettings {
        profile: opts.profile.clone().or_else(|| config.profile.clone()),
        region: pick(&opts.region, ENV_REGION, &config.region),
        endpoint_url: opts.endpoint_url.clone().or_else(|| config.endpoint_url.clone()),
        force_path_style: opts.force_path_style || config.force_path_style,
        access_key_id: None,
        secret_access_key: None,
    }
}

/// Resolve the pipeline settings from flags, environment and config file.
///
/// `target` is an optional object URL; when given, its bucket (and key,
/// if present) beat every other source.
pub fn resolve_vault(
    config: &Config,
    opts: &PipelineOpts,
    target: Option<&str>,
) -> Result<VaultSettings> {
    let target = match target {
        Some(url) => Some(ObjectRef::parse(url).ok_or_else(|| {
            anyhow!("invalid object URL: {url} (expected s3://bucket/key)")
        })?),
        None => None,
    };

    let key_id = pick(&opts.key_id, ENV_KEY_ID, &config.key_id).ok_or_else(|| {
        anyhow!("key id is required: pass --key-id, set {ENV_KEY_ID}, or add \"key_id\" to the config file")
    })?;

    let bucket = target
        .as_ref()
        .map(|t| t.bucket.clone())
        .or_else(|| pick(&opts.bucket, ENV_BUCKET, &config.bucket))
        .ok_or_else(|| {
            anyhow!("bucket is required: pass --bucket, set {ENV_BUCKET}, or add \"bucket\" to the config file")
        })?;

    let object_key = target
        .as_ref()
        .and_then(|t| (!t.key.is_empty()).then(|| t.key.clone()))
        .or_else(|| pick(&opts.object_key, ENV_OBJECT_KEY, &config.object_key))
        .unwrap_or_else(|| DEFAULT_OBJECT_KEY.to_string());

    let defaults = PathSet::rooted(Path::new(""));
    let paths = PathSet {
        plaintext: pick_path(&opts.plaintext, &config.plaintext_path, defaults.plaintext),
        encrypted: pick_path(&opts.encrypted, &config.encrypted_path, defaults.encrypted),
        downloaded: pick_path(&opts.downloaded, &config.downloaded_path, defaults.downloaded),
        decrypted: pick_path(&opts.decrypted, &config.decrypted_path, defaults.decrypted),
    };

    Ok(VaultSettings {
        key_id,
        object: ObjectRef::new(bucket, object_key),
        paths,
    })
}

fn pick(flag: &Option<String>, env_key: &str, file: &Option<String>) -> Option<String> {
    flag.clone()
        .or_else(|| env::var(env_key).ok())
        .or_else(|| file.clone())
}

fn pick_path(flag: &Option<PathBuf>, file: &Option<PathBuf>, default: PathBuf) -> PathBuf {
    flag.clone().or_else(|| file.clone()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn opts_with(key_id: Option<&str>, bucket: Option<&str>) -> PipelineOpts {
        PipelineOpts {
            key_id: key_id.map(|s| s.to_string()),
            bucket: bucket.map(|s| s.to_string()),
            ..PipelineOpts::default()
        }
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.key_id.is_none());
        assert!(config.bucket.is_none());
        assert!(config.object_key.is_none());
        assert!(!config.force_path_style);
    }

    #[test]
    fn test_config_empty_json() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_partial_deserialization() {
        // Should handle missing fields gracefully
        let json = r#"{"key_id": "alias/vault", "force_path_style": true}"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.key_id, Some("alias/vault".to_string()));
        assert!(config.force_path_style);
        assert!(config.bucket.is_none());
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let config = Config {
            key_id: Some("alias/vault".to_string()),
            bucket: Some("vault-bucket".to_string()),
            plaintext_path: Some(PathBuf::from("/data/in.txt")),
            ..Config::default()
        };

        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_from_missing_file_returns_default() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"bucket": "from-file"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.bucket, Some("from-file".to_string()));
    }

    #[test]
    fn test_resolve_vault_defaults() {
        // Inherited values would shadow the built-in default under test.
        env::remove_var(ENV_OBJECT_KEY);
        let settings = resolve_vault(
            &Config::default(),
            &opts_with(Some("alias/vault"), Some("vault-bucket")),
            None,
        )
        .unwrap();

        assert_eq!(settings.key_id, "alias/vault");
        assert_eq!(settings.object, ObjectRef::new("vault-bucket", "encrypted"));
        assert_eq!(settings.paths, PathSet::rooted(Path::new("")));
    }

    #[test]
    fn test_resolve_vault_requires_key_id() {
        env::remove_var(ENV_KEY_ID);
        let err = resolve_vault(&Config::default(), &opts_with(None, Some("b")), None).unwrap_err();
        assert!(err.to_string().contains("key id is required"));
    }

    // The only test that touches KMS_VAULT_BUCKET; both the missing-bucket
    // and the precedence assertions live here so no parallel test observes
    // the variable mid-change.
    #[test]
    fn test_resolve_vault_bucket_sources() {
        env::remove_var(ENV_BUCKET);
        let opts = opts_with(Some("alias/vault"), None);

        let err = resolve_vault(&Config::default(), &opts, None).unwrap_err();
        assert!(err.to_string().contains("bucket is required"));

        let file_config = Config {
            bucket: Some("file-bucket".to_string()),
            ..Config::default()
        };
        let settings = resolve_vault(&file_config, &opts, None).unwrap();
        assert_eq!(settings.object.bucket, "file-bucket");

        env::set_var(ENV_BUCKET, "env-bucket");
        let settings = resolve_vault(&file_config, &opts, None).unwrap();
        assert_eq!(settings.object.bucket, "env-bucket");

        let flag_opts = opts_with(Some("alias/vault"), Some("flag-bucket"));
        let settings = resolve_vault(&file_config, &flag_opts, None).unwrap();
        assert_eq!(settings.object.bucket, "flag-bucket");

        env::remove_var(ENV_BUCKET);
    }

    #[test]
    fn test_resolve_vault_target_url_beats_flags() {
        let opts = opts_with(Some("alias/vault"), Some("flag-bucket"));
        let settings =
            resolve_vault(&Config::default(), &opts, Some("s3://url-bucket/url-key")).unwrap();
        assert_eq!(settings.object, ObjectRef::new("url-bucket", "url-key"));
    }

    #[test]
    fn test_resolve_vault_target_url_bucket_only() {
        let mut opts = opts_with(Some("alias/vault"), None);
        opts.object_key = Some("flag-key".to_string());

        let settings = resolve_vault(&Config::default(), &opts, Some("s3://url-bucket")).unwrap();
        assert_eq!(settings.object, ObjectRef::new("url-bucket", "flag-key"));
    }

    #[test]
    fn test_resolve_vault_rejects_bad_target_url() {
        let opts = opts_with(Some("alias/vault"), None);
        let err = resolve_vault(&Config::default(), &opts, Some("not-a-url")).unwrap_err();
        assert!(err.to_string().contains("invalid object URL"));
    }

    #[test]
    fn test_resolve_vault_path_overrides() {
        let mut opts = opts_with(Some("alias/vault"), Some("b"));
        opts.plaintext = Some(PathBuf::from("/override/in.txt"));
        let file_config = Config {
            decrypted_path: Some(PathBuf::from("/from-file/out.txt")),
            ..Config::default()
        };

        let settings = resolve_vault(&file_config, &opts, None).unwrap();
        assert_eq!(settings.paths.plaintext, PathBuf::from("/override/in.txt"));
        assert_eq!(settings.paths.decrypted, PathBuf::from("/from-file/out.txt"));
        assert_eq!(settings.paths.encrypted, PathBuf::from("encrypted.bin"));
    }

    #[test]
    fn test_resolve_aws_layering() {
        let config = Config {
            profile: Some("file-profile".to_string()),
            endpoint_url: Some("http://file:4566".to_string()),
            force_path_style: true,
            ..Config::default()
        };
        let opts = AwsOpts {
            profile: Some("flag-profile".to_string()),
            ..AwsOpts::default()
        };

        let settings = resolve_aws(&config, &opts);
        assert_eq!(settings.profile, Some("flag-profile".to_string()));
        assert_eq!(settings.endpoint_url, Some("http://file:4566".to_string()));
        assert!(settings.force_path_style);
        assert!(settings.access_key_id.is_none());
    }

    // The only test that touches KMS_VAULT_REGION.
    #[test]
    fn test_resolve_aws_region_from_env() {
        env::set_var(ENV_REGION, "eu-central-1");
        let settings = resolve_aws(&Config::default(), &AwsOpts::default());
        assert_eq!(settings.region, Some("eu-central-1".to_string()));
        env::remove_var(ENV_REGION);

        let flag_opts = AwsOpts {
            region: Some("us-west-2".to_string()),
            ..AwsOpts::default()
        };
        let settings = resolve_aws(&Config::default(), &flag_opts);
        assert_eq!(settings.region, Some("us-west-2".to_string()));
    }
}
