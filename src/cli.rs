//! Command-line interface definition

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::aws::iam::DEFAULT_LIST_LIMIT;

/// CLI surface. With no subcommand the tool runs the full round trip:
/// encrypt and upload, then download and decrypt.
#[derive(Parser, Debug)]
#[command(
    name = "kms-vault",
    about = "Encrypt files with AWS KMS and store the ciphertext in S3",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub aws: AwsOpts,

    #[command(flatten)]
    pub pipeline: PipelineOpts,
}

/// Connection flags, accepted by every command.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct AwsOpts {
    /// AWS profile name from the shared config files
    #[arg(long, global = true)]
    pub profile: Option<String>,

    /// AWS region override
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Custom service endpoint (LocalStack, MinIO)
    #[arg(long, global = true, value_name = "URL")]
    pub endpoint_url: Option<String>,

    /// Use path-style S3 addressing (needed by most custom endpoints)
    #[arg(long, global = true)]
    pub force_path_style: bool,
}

/// Pipeline flags, accepted everywhere but read only by the pipeline
/// commands (run, store, fetch).
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct PipelineOpts {
    /// KMS key id or ARN used to encrypt
    #[arg(long, global = true, value_name = "KEY")]
    pub key_id: Option<String>,

    /// Bucket holding the ciphertext object
    #[arg(long, global = true)]
    pub bucket: Option<String>,

    /// Object key the ciphertext is stored under
    #[arg(long, global = true, value_name = "KEY")]
    pub object_key: Option<String>,

    /// Path of the plaintext source file
    #[arg(long, global = true, value_name = "PATH")]
    pub plaintext: Option<PathBuf>,

    /// Path the ciphertext is staged at before upload
    #[arg(long, global = true, value_name = "PATH")]
    pub encrypted: Option<PathBuf>,

    /// Path the downloaded blob is written to
    #[arg(long, global = true, value_name = "PATH")]
    pub downloaded: Option<PathBuf>,

    /// Path the decrypted output is written to
    #[arg(long, global = true, value_name = "PATH")]
    pub decrypted: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Encrypt and upload, then download and decrypt (the default)
    Run {
        /// Object URL (s3://bucket/key) overriding --bucket/--object-key
        target: Option<String>,
    },
    /// Encrypt the plaintext file and upload the ciphertext
    Store {
        /// Object URL (s3://bucket/key) overriding --bucket/--object-key
        target: Option<String>,
    },
    /// Download the ciphertext object and decrypt it
    Fetch {
        /// Object URL (s3://bucket/key) overriding --bucket/--object-key
        target: Option<String>,
    },
    /// List accessible buckets
    Buckets,
    /// KMS key administration
    #[command(subcommand)]
    Key(KeyCommand),
    /// IAM user administration
    #[command(subcommand)]
    User(UserCommand),
    /// IAM policy administration
    #[command(subcommand)]
    Policy(PolicyCommand),
    /// Manage tool configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum KeyCommand {
    /// Create a symmetric key
    Create {
        /// Tag to attach, as NAME=VALUE (repeatable)
        #[arg(long = "tag", value_name = "NAME=VALUE", value_parser = parse_tag)]
        tags: Vec<(String, String)>,
    },
    /// Disable a key
    Disable {
        /// Key id or ARN
        key_id: String,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum UserCommand {
    /// Create a user
    Create { name: String },
    /// Look up a user
    Get { name: String },
    /// Delete a user
    Delete { name: String },
    /// List users
    List {
        /// Maximum number of users to return
        #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
        max: i32,
    },
    /// Create an access key pair for a user
    AccessKey { name: String },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum PolicyCommand {
    /// Create a managed policy from a single-statement document
    Create {
        name: String,
        /// Action the statement covers (repeatable)
        #[arg(long = "action", value_name = "ACTION", required = true)]
        actions: Vec<String>,
        /// Resource ARN the statement applies to
        #[arg(long, value_name = "ARN")]
        resource: String,
        /// Emit a Deny statement instead of Allow
        #[arg(long)]
        deny: bool,
    },
    /// Look up a managed policy by ARN
    Get { arn: String },
    /// Delete a managed policy by ARN
    Delete { arn: String },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist
    Init,
}

/// Parse a NAME=VALUE tag argument.
fn parse_tag(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got '{s}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_invocation_has_no_subcommand() {
        let cli = Cli::try_parse_from(["kms-vault"]).unwrap();
        assert_eq!(cli.command, None);
        assert_eq!(cli.pipeline, PipelineOpts::default());
    }

    #[test]
    fn test_parses_run_with_target_url() {
        let cli = Cli::try_parse_from(["kms-vault", "run", "s3://vault/encrypted"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Command::Run {
                target: Some("s3://vault/encrypted".to_string())
            })
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "kms-vault",
            "store",
            "--key-id",
            "alias/vault",
            "--bucket",
            "vault-bucket",
        ])
        .unwrap();

        assert_eq!(cli.command, Some(Command::Store { target: None }));
        assert_eq!(cli.pipeline.key_id, Some("alias/vault".to_string()));
        assert_eq!(cli.pipeline.bucket, Some("vault-bucket".to_string()));
    }

    #[test]
    fn test_global_flags_before_subcommand() {
        let cli = Cli::try_parse_from([
            "kms-vault",
            "--endpoint-url",
            "http://localhost:4566",
            "--force-path-style",
            "buckets",
        ])
        .unwrap();

        assert_eq!(cli.command, Some(Command::Buckets));
        assert_eq!(cli.aws.endpoint_url, Some("http://localhost:4566".to_string()));
        assert!(cli.aws.force_path_style);
    }

    #[test]
    fn test_parses_fetch_with_path_overrides() {
        let cli = Cli::try_parse_from([
            "kms-vault",
            "fetch",
            "--downloaded",
            "/tmp/blob.bin",
            "--decrypted",
            "/tmp/out.txt",
        ])
        .unwrap();

        assert_eq!(cli.command, Some(Command::Fetch { target: None }));
        assert_eq!(cli.pipeline.downloaded, Some(PathBuf::from("/tmp/blob.bin")));
        assert_eq!(cli.pipeline.decrypted, Some(PathBuf::from("/tmp/out.txt")));
    }

    #[test]
    fn test_parses_key_create_with_tags() {
        let cli = Cli::try_parse_from([
            "kms-vault",
            "key",
            "create",
            "--tag",
            "Name=vault",
            "--tag",
            "Env=dev",
        ])
        .unwrap();

        assert_eq!(
            cli.command,
            Some(Command::Key(KeyCommand::Create {
                tags: vec![
                    ("Name".to_string(), "vault".to_string()),
                    ("Env".to_string(), "dev".to_string()),
                ]
            }))
        );
    }

    #[test]
    fn test_rejects_malformed_tag() {
        assert!(Cli::try_parse_from(["kms-vault", "key", "create", "--tag", "novalue"]).is_err());
    }

    #[test]
    fn test_parses_key_disable() {
        let cli = Cli::try_parse_from(["kms-vault", "key", "disable", "alias/vault"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Command::Key(KeyCommand::Disable {
                key_id: "alias/vault".to_string()
            }))
        );
    }

    #[test]
    fn test_user_list_default_max() {
        let cli = Cli::try_parse_from(["kms-vault", "user", "list"]).unwrap();
        assert_eq!(cli.command, Some(Command::User(UserCommand::List { max: 15 })));
    }

    #[test]
    fn test_parses_user_access_key() {
        let cli = Cli::try_parse_from(["kms-vault", "user", "access-key", "alice"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Command::User(UserCommand::AccessKey {
                name: "alice".to_string()
            }))
        );
    }

    #[test]
    fn test_policy_create_requires_action() {
        assert!(Cli::try_parse_from(["kms-vault", "policy", "create", "p", "--resource", "*"])
            .is_err());
    }

    #[test]
    fn test_parses_policy_create() {
        let cli = Cli::try_parse_from([
            "kms-vault",
            "policy",
            "create",
            "vault-read",
            "--action",
            "s3:GetObject",
            "--action",
            "s3:ListBucket",
            "--resource",
            "arn:aws:s3:::vault/*",
        ])
        .unwrap();

        assert_eq!(
            cli.command,
            Some(Command::Policy(PolicyCommand::Create {
                name: "vault-read".to_string(),
                actions: vec!["s3:GetObject".to_string(), "s3:ListBucket".to_string()],
                resource: "arn:aws:s3:::vault/*".to_string(),
                deny: false,
            }))
        );
    }

    #[test]
    fn test_parses_config_init() {
        let cli = Cli::try_parse_from(["kms-vault", "config", "init"]).unwrap();
        assert_eq!(cli.command, Some(Command::Config(ConfigCommand::Init)));
    }

    #[test]
    fn test_parse_tag_values() {
        assert_eq!(
            parse_tag("Name=vault"),
            Ok(("Name".to_string(), "vault".to_string()))
        );
        assert_eq!(parse_tag("Name="), Ok(("Name".to_string(), String::new())));
        assert!(parse_tag("=value").is_err());
        assert!(parse_tag("plain").is_err());
    }
}
