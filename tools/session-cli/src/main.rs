use std::{
    fs,
    path::{Path, PathBuf},
};

use alloy_primitives::{Address, U256};
use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use kernel_session_key::{
    utils::kernel::EnableData,
    validator::normalize_session,
    LocalSigner, PermissionTree, SessionExport, SessionKeyData, SessionKeyValidator,
    SessionValidatorConfig, UserOperation,
};
use serde_json::json;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

/// Offline tooling for Kernel session keys.
///
/// Session files are `SessionKeyData` JSON (camelCase). Nothing here talks to a node or bundler;
/// output is printed (or written) for the application to submit.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(flatten)]
    network: NetworkArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct NetworkArgs {
    /// Validator deployment JSON (`SessionValidatorConfig`, camelCase); flags below override it.
    #[arg(long, env = "SESSION_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Chain the session is used on (defaults to 1).
    #[arg(long, env = "CHAIN_ID", global = true)]
    chain_id: Option<u64>,

    /// EntryPoint override (defaults to the v0.6 EntryPoint).
    #[arg(long, env = "ENTRY_POINT", global = true)]
    entry_point: Option<Address>,

    /// Session-key validator override (defaults to the deployed Kernel validator).
    #[arg(long, env = "SESSION_KEY_VALIDATOR", global = true)]
    validator: Option<Address>,
}

impl NetworkArgs {
    fn config(&self) -> Result<SessionValidatorConfig> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => SessionValidatorConfig::default(),
        };
        if let Some(chain_id) = self.chain_id {
            config.chain_id = chain_id;
        }
        if let Some(entry_point) = self.entry_point {
            config.entry_point = entry_point;
        }
        if let Some(validator) = self.validator {
            config.validator_address = validator;
        }
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the permission Merkle root and leaves of a session file.
    Root {
        #[arg(long)]
        session: PathBuf,
    },

    /// Print the enable data registered with the validator.
    EnableData {
        #[arg(long)]
        session: PathBuf,

        /// Session private key (hex string, 0x...).
        #[arg(long, env = "SESSION_PRIVATE_KEY")]
        session_key: String,

        /// Append this nonce to the enable data.
        #[arg(long)]
        nonce: Option<U256>,
    },

    /// Build a session export, optionally signing the enable message with the sudo key.
    Export {
        #[arg(long)]
        session: PathBuf,

        #[arg(long, env = "SESSION_PRIVATE_KEY")]
        session_key: String,

        /// Account owner key; with `--account`, adds an enable signature to the export.
        #[arg(long, env = "SUDO_PRIVATE_KEY", requires = "account")]
        sudo_key: Option<String>,

        /// Kernel account the session is enabled on.
        #[arg(long, env = "ACCOUNT")]
        account: Option<Address>,

        /// Enable-data nonce carried in the export.
        #[arg(long)]
        nonce: Option<U256>,

        /// Override `validUntil` (RFC 3339, eg 2026-12-31T00:00:00Z).
        #[arg(long)]
        valid_until: Option<String>,

        /// Write the export here instead of printing it.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Sign a UserOperation (JSON) with an exported session.
    Sign {
        /// Export string, or `@path` to read it from a file.
        #[arg(long, env = "SESSION_EXPORT")]
        export: String,

        #[arg(long)]
        user_op: PathBuf,

        /// Emit the gas-estimation stub signature instead.
        #[arg(long)]
        stub: bool,
    },

    /// Decode an export and print its session summary.
    Inspect {
        #[arg(long, env = "SESSION_EXPORT")]
        export: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = cli.network.config()?;
    info!(chain_id = config.chain_id, validator = %config.validator_address, "using validator config");

    match cli.command {
        Command::Root { session } => {
            let mut session = read_session(&session)?;
            normalize_session(&mut session)?;
            let tree = PermissionTree::build(&session.permissions);
            print_json(&json!({
                "root": tree.root(),
                "delegatesViaFallback": tree.delegates_via_fallback(),
                "leaves": tree.leaves(),
            }))
        }
        Command::EnableData { session, session_key, nonce } => {
            let mut validator = build_validator(&session, &session_key, config)?;
            if let Some(nonce) = nonce {
                validator = validator.with_nonce(nonce);
            }
            print_json(&json!({
                "sessionKey": validator.session_key_address(),
                "root": validator.merkle_root(),
                "enableData": validator.enable_data(),
                "validatorData": validator.validator_data(),
            }))
        }
        Command::Export { session, session_key, sudo_key, account, nonce, valid_until, out } => {
            let mut data = read_session(&session)?;
            if let Some(valid_until) = valid_until {
                data.valid_until = parse_timestamp(&valid_until)?;
            }
            let mut validator = SessionKeyValidator::new(parse_key(&session_key)?, data, config)?;
            if let Some(nonce) = nonce {
                validator = validator.with_nonce(nonce);
            }

            let enable_signature = match (sudo_key, account) {
                (Some(sudo_key), Some(account)) => {
                    let sudo = parse_key(&sudo_key)?;
                    Some(validator.enable_signature(&sudo, account).await?)
                }
                _ => None,
            };
            let encoded = validator.to_export(enable_signature).encode()?;

            match out {
                Some(path) => {
                    write_atomic(&path, encoded.as_bytes())?;
                    info!(path = %path.display(), session_key = %validator.session_key_address(), "wrote session export");
                    Ok(())
                }
                None => {
                    println!("{encoded}");
                    Ok(())
                }
            }
        }
        Command::Sign { export, user_op, stub } => {
            let (validator, _) = read_export(&export)?.into_validator(config)?;
            let raw = fs::read_to_string(&user_op)
                .with_context(|| format!("failed reading {}", user_op.display()))?;
            let user_op: UserOperation = serde_json::from_str(&raw)
                .with_context(|| format!("failed parsing UserOperation in {}", user_op.display()))?;

            let signature = if stub {
                validator.stub_signature(&user_op)?
            } else {
                validator.sign_user_operation(&user_op).await?
            };
            print_json(&json!({
                "userOpHash": validator.user_op_hash(&user_op),
                "signature": signature,
            }))
        }
        Command::Inspect { export } => {
            let export = read_export(&export)?;
            let has_enable_signature = export.enable_signature.is_some();
            let (validator, _) = export.into_validator(config)?;
            let enable_data = EnableData::decode(&validator.enable_data())
                .ok_or_else(|| anyhow!("validator produced malformed enable data"))?;
            print_json(&json!({
                "sessionKey": enable_data.session_key,
                "root": enable_data.merkle_root,
                "validAfter": enable_data.valid_after,
                "validUntil": enable_data.valid_until,
                "paymaster": enable_data.paymaster,
                "paymasterPolicy": format!("{:?}", validator.session_data().paymaster_policy()),
                "permissions": validator.permissions().len(),
                "enableSignature": has_enable_signature,
            }))
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn read_session(path: &Path) -> Result<SessionKeyData> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed parsing session JSON in {}", path.display()))
}

fn read_config(path: &Path) -> Result<SessionValidatorConfig> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed reading {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed parsing validator config in {}", path.display()))
}

fn read_export(arg: &str) -> Result<SessionExport> {
    let encoded = match arg.strip_prefix('@') {
        Some(path) => fs::read_to_string(path).with_context(|| format!("failed reading {path}"))?,
        None => arg.to_string(),
    };
    Ok(SessionExport::decode(&encoded)?)
}

fn parse_key(key: &str) -> Result<LocalSigner> {
    key.parse().map_err(|e| anyhow!("invalid private key: {e}"))
}

fn build_validator(
    session: &Path,
    session_key: &str,
    config: SessionValidatorConfig,
) -> Result<SessionKeyValidator<LocalSigner>> {
    Ok(SessionKeyValidator::new(parse_key(session_key)?, read_session(session)?, config)?)
}

fn parse_timestamp(value: &str) -> Result<u64> {
    let at = OffsetDateTime::parse(value, &Rfc3339)
        .with_context(|| format!("invalid RFC 3339 timestamp `{value}`"))?;
    u64::try_from(at.unix_timestamp()).map_err(|_| anyhow!("timestamp `{value}` is before 1970"))
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("failed serialising output")?);
    Ok(())
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    if !parent.exists() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating directory {}", parent.display()))?;
    }

    let tmp_path = tmp_path_for(path);
    fs::write(&tmp_path, contents)
        .with_context(|| format!("failed writing temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("failed replacing {}", path.display()))?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}
