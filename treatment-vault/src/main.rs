//! Treatment record vault CLI
//!
//! Seals JSON treatment payloads into dual-access records, opens them with
//! either party's secret and re-wraps a party's key after a password change.
//!
//! Secrets are never taken as arguments: each subcommand names the
//! environment variable to read them from. A `.env` file is loaded first.
//!
//! Usage:
//!   treatment-vault seal --payload visit.json --out record.json
//!   treatment-vault open --record record.json --role patient
//!   treatment-vault rewrap --record record.json --role hospital --out record.json
//!
//! Exit status is 2 when a record could not be opened.

use anyhow::Context;
use clap::{Parser, Subcommand};
use crypto::CipherConfig;
use error_common::{log_error, RustCareError};
use logger_redacted::{LogFormat, LoggerConfig, PiiRedactor, RedactionConfig};
use secrecy::SecretString;
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use treatment_vault::{Credentials, EncryptedRecord, OpenOutcome, RecordCipher, Role};

#[derive(Parser, Debug)]
#[command(name = "treatment-vault")]
#[command(about = "Seal and open dual-access encrypted treatment records")]
struct Args {
    /// Log as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encrypt a JSON payload for a hospital and a patient
    Seal {
        /// JSON payload file
        #[arg(long)]
        payload: PathBuf,

        /// Environment variable holding the hospital secret
        #[arg(long, default_value = "HOSPITAL_SECRET")]
        hospital_secret_env: String,

        /// Environment variable holding the patient secret
        #[arg(long, default_value = "PATIENT_SECRET")]
        patient_secret_env: String,

        /// Existing record this one replaces
        #[arg(long)]
        supersedes: Option<PathBuf>,

        /// Output file, stdout if omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Decrypt a record and print its payload
    Open {
        /// Encrypted record file
        #[arg(long)]
        record: PathBuf,

        /// hospital or patient
        #[arg(long)]
        role: Role,

        /// Environment variable holding the secret for the role
        #[arg(long, default_value = "VAULT_SECRET")]
        secret_env: String,
    },

    /// Re-wrap one party's key under a new secret
    Rewrap {
        /// Encrypted record file
        #[arg(long)]
        record: PathBuf,

        /// hospital or patient
        #[arg(long)]
        role: Role,

        /// Environment variable holding the current secret
        #[arg(long, default_value = "VAULT_SECRET")]
        secret_env: String,

        /// Environment variable holding the new secret
        #[arg(long, default_value = "VAULT_NEW_SECRET")]
        new_secret_env: String,

        /// Output file, stdout if omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut log_config = LoggerConfig::from_env();
    if args.verbose {
        log_config = log_config.with_level("debug");
    }
    if args.json_logs {
        log_config.format = LogFormat::Json;
    }
    if let Err(e) = logger_redacted::init(&log_config) {
        eprintln!("treatment-vault: {e}");
        return ExitCode::FAILURE;
    }

    match run(args.command) {
        Ok(code) => code,
        Err(e) => {
            let message = format!("{e:#}");
            log_error("treatment-vault", &RustCareError::from(e));
            match PiiRedactor::new(RedactionConfig::default()) {
                Ok(redactor) => eprintln!("treatment-vault: {}", redactor.redact(&message)),
                Err(_) => eprintln!("treatment-vault: operation failed"),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> anyhow::Result<ExitCode> {
    let cipher = RecordCipher::new(CipherConfig::from_env()?)?;

    match command {
        Command::Seal {
            payload,
            hospital_secret_env,
            patient_secret_env,
            supersedes,
            out,
        } => {
            let payload: Value = read_json(&payload)?;
            let hospital_secret = secret_from_env(&hospital_secret_env)?;
            let patient_secret = secret_from_env(&patient_secret_env)?;

            let record = match supersedes {
                Some(path) => {
                    let previous: EncryptedRecord = read_json(&path)?;
                    cipher.supersede(&previous, &payload, &hospital_secret, &patient_secret)?
                }
                None => cipher.encrypt_record(&payload, &hospital_secret, &patient_secret)?,
            };

            write_json(&record, out.as_deref())?;
            info!(record_id = %record.record_id, "record written");
            Ok(ExitCode::SUCCESS)
        }

        Command::Open {
            record,
            role,
            secret_env,
        } => {
            let record: EncryptedRecord = read_json(&record)?;
            let credentials = Credentials::new(role, secret_from_env(&secret_env)?);

            match cipher.decrypt_record::<Value>(&record, &credentials) {
                OpenOutcome::Opened(payload) => {
                    write_json(&payload, None)?;
                    Ok(ExitCode::SUCCESS)
                }
                OpenOutcome::Rejected(rejection) => {
                    eprintln!("treatment-vault: {rejection} ({})", rejection.code());
                    Ok(ExitCode::from(2))
                }
            }
        }

        Command::Rewrap {
            record,
            role,
            secret_env,
            new_secret_env,
            out,
        } => {
            let record: EncryptedRecord = read_json(&record)?;
            let credentials = Credentials::new(role, secret_from_env(&secret_env)?);
            let new_secret = secret_from_env(&new_secret_env)?;

            let updated = cipher.rewrap(&record, &credentials, &new_secret)?;

            write_json(&updated, out.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn secret_from_env(name: &str) -> anyhow::Result<SecretString> {
    let value = std::env::var(name).with_context(|| format!("environment variable {name} is not set"))?;
    Ok(SecretString::new(value))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file)).with_context(|| format!("failed to parse {}", path.display()))
}

fn write_json<T: Serialize>(value: &T, path: Option<&Path>) -> anyhow::Result<()> {
    let mut writer: Box<dyn Write> = match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };

    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
