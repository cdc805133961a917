//! certgen CLI application.
//!
//! Each command reads one YAML request file (`--config`) and runs the
//! matching issuance flow. Progress is reported through `tracing`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use certgen::error::{CertgenError, Result};
use certgen::issuance;
use certgen::policy::CertificateClass;
use certgen::request::{CaRequest, LeafRequest, SignRequest, TrustRequest};
use certgen::trust::platform_trust_store;
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "certgen")]
#[command(about = "Generate and manage class-graded X.509 certificates", long_about = None)]
struct Cli {
    /// Path to the YAML request file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a root or intermediate CA certificate
    Ca,

    /// Generate a server or client certificate signed by a CA
    Cert,

    /// Sign an existing certificate with a CA
    Sign,

    /// Install a certificate into the operating system trust store
    Trust,

    /// Display the certificate classes and their requirements
    Classes,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.quiet);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Ca => {
            let issued = issuance::generate_ca(load_config::<CaRequest>(config)?)?;
            println!("CA certificate: {}", issued.paths.certificate.display());
            println!("CA private key: {}", issued.paths.private_key.display());
        }
        Commands::Cert => {
            let issued = issuance::generate_certificate(load_config::<LeafRequest>(config)?)?;
            println!("Certificate: {}", issued.paths.certificate.display());
            println!("Private key: {}", issued.paths.private_key.display());
        }
        Commands::Sign => {
            let signed = issuance::sign_certificate(load_config::<SignRequest>(config)?)?;
            println!("Signed certificate: {}", signed.path.display());
        }
        Commands::Trust => {
            let request = load_config::<TrustRequest>(config)?;
            let store = platform_trust_store()?;
            let trusted = issuance::trust_certificate(request, store.as_ref())?;
            println!("Trusted certificate: {}", trusted.display());
        }
        Commands::Classes => print_classes(),
    }
    Ok(())
}

fn load_config<T: DeserializeOwned>(path: Option<&Path>) -> Result<T> {
    let path = path.ok_or_else(|| {
        CertgenError::InvalidInput("a request file is required (--config <FILE>)".to_string())
    })?;
    let text = std::fs::read_to_string(path).map_err(|source| CertgenError::IoError {
        path: path.to_path_buf(),
        source,
    })?;
    serde_norway::from_str(&text)
        .map_err(|e| CertgenError::InvalidInput(format!("{}: {e}", path.display())))
}

fn print_classes() {
    println!("Certificate Classes and Requirements:");
    println!(
        "{:<6}{:<10}{:<10}{:<40}{}",
        "Class", "Key Size", "Validity", "Usage", "CA Path Length"
    );
    for class in CertificateClass::ALL {
        let requirements = class.requirements();
        let usages = requirements
            .allowed_extended_key_usages
            .iter()
            .map(|usage| usage.label())
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "{:<6}{:<10}{:<10}{:<40}{}",
            class.as_u8(),
            format!("{} bits", requirements.min_key_size_bits),
            format!("{} years", requirements.max_validity_days / 365),
            usages,
            requirements.max_path_length
        );
    }
    println!();
    println!("Class Details:");
    println!("- Class 1: Low-assurance certificates for personal use and email protection");
    println!("- Class 2: Medium-assurance certificates with organization validation");
    println!(
        "- Class 3: High-assurance certificates with extended validation and code signing capability"
    );
}
