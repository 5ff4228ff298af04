//! CLI command definitions and argument parsing

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use sgw_core::credential::{create_credential, CosmosCredential};
use sgw_core::envelope::EnvelopeBuilder;
use sgw_core::open::EnvelopeOpener;
use sgw_core::signer::LocalWallet;
use sgw_core::types::{GatewayExecuteMsg, SealedEnvelope};
use sgw_crypto::session_keys::SessionKeyCache;

use crate::config::Config;
use crate::keyfile::KeyFile;
use crate::ExitCode;

/// Seal, open, and verify secret gateway envelopes
#[derive(Parser, Debug)]
#[command(name = "sgw")]
#[command(version, about = "Seal, open, and verify secret gateway envelopes")]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Config file path
    #[arg(long, global = true, env = "SGW_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a key file
    Keygen(KeygenArgs),
    /// Encrypt and sign a message for a recipient
    Seal(SealArgs),
    /// Open an envelope with the recipient key
    Open(OpenArgs),
    /// Sign data as an ADR-036 credential
    Credential(CredentialArgs),
    /// Verify an ADR-036 credential
    VerifyCredential(VerifyCredentialArgs),
}

#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Where to write the key file
    #[arg(long)]
    pub out: PathBuf,

    /// Address prefix; defaults to the configured prefix
    #[arg(long)]
    pub hrp: Option<String>,
}

#[derive(Args, Debug)]
pub struct SealArgs {
    /// Signer key file
    #[arg(long)]
    pub key: PathBuf,

    /// Recipient encryption key, base64 compressed secp256k1
    #[arg(long)]
    pub recipient: String,

    /// Inner message as JSON; `-` reads stdin
    #[arg(long)]
    pub msg: String,
}

#[derive(Args, Debug)]
pub struct OpenArgs {
    /// Recipient key file
    #[arg(long)]
    pub key: PathBuf,

    /// Envelope JSON file, bare or wrapped in `{"encrypted":...}`; `-` reads stdin
    #[arg(long)]
    pub envelope: String,
}

#[derive(Args, Debug)]
pub struct CredentialArgs {
    /// Signer key file
    #[arg(long)]
    pub key: PathBuf,

    /// Data to sign, as UTF-8 text
    #[arg(long)]
    pub data: String,
}

#[derive(Args, Debug)]
pub struct VerifyCredentialArgs {
    /// Credential JSON file; `-` reads stdin
    #[arg(long)]
    pub credential: String,

    /// Prefix for credentials without one; defaults to the configured prefix
    #[arg(long)]
    pub hrp: Option<String>,
}

#[derive(Serialize)]
struct OpenOutput {
    sender: String,
    hrp: String,
    message: Value,
}

#[derive(Serialize)]
struct VerifyOutput {
    valid: bool,
    address: String,
}

impl Cli {
    /// Execute the CLI command with a loaded configuration
    pub async fn execute_with_config(self, config: Config) -> anyhow::Result<ExitCode> {
        match self.command {
            Commands::Keygen(args) => keygen(args, &config),
            Commands::Seal(args) => seal(args, &config).await,
            Commands::Open(args) => open(args),
            Commands::Credential(args) => credential(args, &config).await,
            Commands::VerifyCredential(args) => verify_credential(args, &config),
        }
    }
}

fn keygen(args: KeygenArgs, config: &Config) -> anyhow::Result<ExitCode> {
    let hrp = args.hrp.as_deref().unwrap_or(&config.envelope.default_hrp);
    let wallet = LocalWallet::generate(hrp)?;
    let key = KeyFile::from_wallet(&wallet);
    key.save(&args.out)
        .with_context(|| format!("writing {}", args.out.display()))?;
    info!(address = %key.address, "key file written");
    print_json(&key.info())?;
    Ok(ExitCode::Success)
}

async fn seal(args: SealArgs, config: &Config) -> anyhow::Result<ExitCode> {
    let wallet = load_key(&args.key)?.wallet()?;
    let msg: Value = serde_json::from_str(&read_input(&args.msg)?).context("message is not valid JSON")?;

    let builder = EnvelopeBuilder::new(Arc::new(SessionKeyCache::new()), config.envelope.clone());
    let wrapped = match serde_json::from_value::<GatewayExecuteMsg>(msg.clone()) {
        Ok(execute) => builder.build_execute_msg(&wallet, &execute, Some(&args.recipient)).await?,
        Err(_) => GatewayExecuteMsg::Encrypted(builder.build(&wallet, &msg, Some(&args.recipient)).await?),
    };
    print_json(&wrapped)?;
    Ok(ExitCode::Success)
}

fn open(args: OpenArgs) -> anyhow::Result<ExitCode> {
    let opener = EnvelopeOpener::new(load_key(&args.key)?.key_pair()?);
    let value: Value = serde_json::from_str(&read_input(&args.envelope)?).context("envelope is not valid JSON")?;
    let envelope: SealedEnvelope = match serde_json::from_value::<GatewayExecuteMsg>(value.clone()) {
        Ok(GatewayExecuteMsg::Encrypted(envelope)) => envelope,
        Ok(_) => bail!("message is not encrypted"),
        Err(_) => serde_json::from_value(value).context("not a sealed envelope")?,
    };

    let opened = opener.open(&envelope)?;
    let message = serde_json::from_slice(&opened.message)
        .unwrap_or_else(|_| Value::String(BASE64.encode(&opened.message)));
    print_json(&OpenOutput {
        sender: opened.payload.user_address,
        hrp: opened.payload.hrp,
        message,
    })?;
    Ok(ExitCode::Success)
}

async fn credential(args: CredentialArgs, config: &Config) -> anyhow::Result<ExitCode> {
    let wallet = load_key(&args.key)?.wallet()?;
    let credential = create_credential(&wallet, args.data.as_bytes(), config.envelope.sign_timeout()).await?;
    print_json(&credential)?;
    Ok(ExitCode::Success)
}

fn verify_credential(args: VerifyCredentialArgs, config: &Config) -> anyhow::Result<ExitCode> {
    let credential: CosmosCredential =
        serde_json::from_str(&read_input(&args.credential)?).context("malformed credential")?;
    let hrp = args.hrp.as_deref().unwrap_or(&config.envelope.default_hrp);

    let valid = credential.verify(hrp)?;
    print_json(&VerifyOutput {
        valid,
        address: credential.address(hrp)?,
    })?;
    Ok(if valid {
        ExitCode::Success
    } else {
        ExitCode::VerificationFailed
    })
}

fn load_key(path: &Path) -> anyhow::Result<KeyFile> {
    KeyFile::load(path).with_context(|| format!("reading key file {}", path.display()))
}

/// Read a file, or stdin for `-`.
fn read_input(source: &str) -> anyhow::Result<String> {
    if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    let path = Path::new(source);
    if path.exists() {
        return std::fs::read_to_string(path).with_context(|| format!("reading {source}"));
    }
    Ok(source.to_string())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
