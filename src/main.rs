//! kms-vault command-line tool
//!
//! Encrypts local files with AWS KMS, stores the ciphertext in S3 and
//! fetches and decrypts it on demand.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kms_vault::aws::types::{PolicyDocument, PolicyEffect, PolicySummary, UserSummary};
use kms_vault::aws::{IamClient, KmsClient, S3Client};
use kms_vault::cli::{Cli, Command, ConfigCommand, KeyCommand, PolicyCommand, UserCommand};
use kms_vault::config::{self, Config};
use kms_vault::pipeline::Pipeline;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    tracing::debug!("Starting kms-vault v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Command failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;

    match cli.command.clone().unwrap_or(Command::Run { target: None }) {
        Command::Run { target } => {
            let pipeline = build_pipeline(&config, &cli, target.as_deref()).await?;
            pipeline.run().await?;
            println!(
                "Round trip complete: {} restored to {}",
                pipeline.object(),
                pipeline.paths().decrypted.display()
            );
        }
        Command::Store { target } => {
            let pipeline = build_pipeline(&config, &cli, target.as_deref()).await?;
            pipeline.encrypt_and_upload().await?;
            println!(
                "Stored {} as {}",
                pipeline.paths().plaintext.display(),
                pipeline.object()
            );
        }
        Command::Fetch { target } => {
            let pipeline = build_pipeline(&config, &cli, target.as_deref()).await?;
            pipeline.download_and_decrypt().await?;
            println!(
                "Fetched {} to {}",
                pipeline.object(),
                pipeline.paths().decrypted.display()
            );
        }
        Command::Buckets => {
            let aws = config::resolve_aws(&config, &cli.aws);
            let store = S3Client::new(&aws.load().await, aws.force_path_style);
            list_buckets(&store).await?;
        }
        Command::Key(command) => {
            let keys = KmsClient::new(&load_sdk_config(&config, &cli).await);
            run_key_command(&keys, command).await?;
        }
        Command::User(command) => {
            let iam = IamClient::new(&load_sdk_config(&config, &cli).await);
            run_user_command(&iam, command).await?;
        }
        Command::Policy(command) => {
            let iam = IamClient::new(&load_sdk_config(&config, &cli).await);
            run_policy_command(&iam, command).await?;
        }
        Command::Config(ConfigCommand::Init) => {
            let path = Config::write_default_if_missing()?;
            println!("Config file at {}", path.display());
        }
    }

    Ok(())
}

/// Initialize logging; RUST_LOG overrides the default `info` level.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(env_filter)
        .init();
}

async fn load_sdk_config(config: &Config, cli: &Cli) -> aws_config::SdkConfig {
    config::resolve_aws(config, &cli.aws).load().await
}

async fn build_pipeline(
    config: &Config,
    cli: &Cli,
    target: Option<&str>,
) -> Result<Pipeline<KmsClient, S3Client>> {
    let vault = config::resolve_vault(config, &cli.pipeline, target)?;
    let aws = config::resolve_aws(config, &cli.aws);
    let sdk_config = aws.load().await;

    let keys = KmsClient::new(&sdk_config);
    let store = S3Client::new(&sdk_config, aws.force_path_style);
    Ok(Pipeline::new(keys, store, vault.key_id, vault.object, vault.paths))
}

async fn list_buckets(store: &S3Client) -> Result<()> {
    let buckets = store.list_buckets().await?;
    if buckets.is_empty() {
        println!("No buckets");
        return Ok(());
    }

    println!("Buckets in {}:", store.region());
    for bucket in buckets {
        match bucket.created {
            Some(created) => {
                println!("* {} created on {}", bucket.name, created.format("%Y-%m-%d %H:%M:%S"))
            }
            None => println!("* {}", bucket.name),
        }
    }
    Ok(())
}

async fn run_key_command(keys: &KmsClient, command: KeyCommand) -> Result<()> {
    match command {
        KeyCommand::Create { tags } => {
            let key = keys.create_key(&tags).await?;
            println!("Created key {}", key.key_id);
            if let Some(arn) = &key.arn {
                println!("  ARN: {arn}");
            }
            if !key.enabled {
                println!("  Warning: key is not enabled");
            }
        }
        KeyCommand::Disable { key_id } => {
            keys.disable_key(&key_id).await?;
            println!("Disabled key {key_id}");
        }
    }
    Ok(())
}

async fn run_user_command(iam: &IamClient, command: UserCommand) -> Result<()> {
    match command {
        UserCommand::Create { name } => {
            let user = iam.create_user(&name).await?;
            print_user(&user);
        }
        UserCommand::Get { name } => {
            let user = iam.get_user(&name).await?;
            print_user(&user);
        }
        UserCommand::Delete { name } => {
            iam.delete_user(&name).await?;
            println!("Deleted user {name}");
        }
        UserCommand::List { max } => {
            let users = iam.list_users(max).await?;
            if users.is_empty() {
                println!("No users");
                return Ok(());
            }
            for (index, user) in users.iter().enumerate() {
                match user.created {
                    Some(created) => {
                        println!("{index} {} created on {}", user.name, created.format("%Y-%m-%d"))
                    }
                    None => println!("{index} {}", user.name),
                }
            }
        }
        UserCommand::AccessKey { name } => {
            let key = iam.create_access_key(&name).await?;
            println!("Access key for {}:", key.user_name);
            println!("  Access key id: {}", key.access_key_id);
            println!("  Secret access key: {}", key.secret_access_key);
            println!("  Status: {}", key.status);
        }
    }
    Ok(())
}

async fn run_policy_command(iam: &IamClient, command: PolicyCommand) -> Result<()> {
    match command {
        PolicyCommand::Create {
            name,
            actions,
            resource,
            deny,
        } => {
            let effect = if deny { PolicyEffect::Deny } else { PolicyEffect::Allow };
            let document = PolicyDocument::single(effect, actions, resource);
            let policy = iam.create_policy(&name, &document).await?;
            print_policy(&policy);
        }
        PolicyCommand::Get { arn } => {
            let policy = iam.get_policy(&arn).await?;
            print_policy(&policy);
        }
        PolicyCommand::Delete { arn } => {
            iam.delete_policy(&arn).await?;
            println!("Deleted policy {arn}");
        }
    }
    Ok(())
}

fn print_user(user: &UserSummary) {
    println!("User {} ({})", user.name, user.user_id);
    println!("  ARN: {}", user.arn);
    if let Some(created) = user.created {
        println!("  Created: {}", created.format("%Y-%m-%d %H:%M:%S"));
    }
}

fn print_policy(policy: &PolicySummary) {
    println!("Policy {}", policy.name.as_deref().unwrap_or("-"));
    if let Some(arn) = &policy.arn {
        println!("  ARN: {arn}");
    }
    if let Some(created) = policy.created {
        println!("  Created: {}", created.format("%Y-%m-%d %H:%M:%S"));
    }
}
