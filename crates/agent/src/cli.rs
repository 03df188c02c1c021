//! The agent's command-line interface. Mirrors the shape of a common
//! operator CLI: a small set of subcommands sharing one set of global
//! options, with `Run` as the default long-lived mode and the remaining
//! subcommands as one-shot bootstrap utilities.
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "agent", version, about = "Zone identity and network-map agent")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the long-lived agent: starts the network map poll loop and
    /// serves this node's own identity.
    Run(RunArgs),

    /// Generate a new self-signed root CA and write its certificate and
    /// private key to disk.
    GenerateRoot(GenerateRootArgs),

    /// Issue a certificate of the given type, signed by a CA certificate
    /// and private key already on disk.
    IssueCert(IssueCertArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Path to the agent's TOML settings file.
    #[arg(long, short = 'c', env = "ZONE_AGENT_CONFIG")]
    pub config: PathBuf,
}

#[derive(Debug, Args)]
pub struct GenerateRootArgs {
    /// Subject distinguished name for the root CA, e.g. "CN=Zone Root CA".
    #[arg(long)]
    pub subject: String,

    /// Where to write the PEM-encoded certificate.
    #[arg(long)]
    pub cert_out: PathBuf,

    /// Where to write the PEM-encoded PKCS#8 private key.
    #[arg(long)]
    pub key_out: PathBuf,
}

#[derive(Debug, Args)]
pub struct IssueCertArgs {
    /// Certificate type to issue: intermediate-ca, node-ca, tls,
    /// legal-identity, network-map, service-identity, or
    /// confidential-legal-identity.
    #[arg(long)]
    pub cert_type: String,

    /// Subject distinguished name for the new certificate.
    #[arg(long)]
    pub subject: String,

    /// Path to the issuing CA's PEM-encoded certificate.
    #[arg(long)]
    pub issuer_cert: PathBuf,

    /// Path to the issuing CA's PEM-encoded PKCS#8 private key.
    #[arg(long)]
    pub issuer_key: PathBuf,

    /// Where to write the newly issued PEM-encoded certificate.
    #[arg(long)]
    pub cert_out: PathBuf,

    /// Where to write the newly generated PEM-encoded PKCS#8 private key.
    #[arg(long)]
    pub key_out: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_subcommand_requires_a_config_path() {
        let result = Cli::try_parse_from(["agent", "run"]);
        assert!(result.is_err());
    }

    #[test]
    fn run_subcommand_parses_with_a_config_path() {
        let cli = Cli::try_parse_from(["agent", "run", "--config", "agent.toml"])
            .expect("failed to parse CLI");
        match cli.command {
            Command::Run(args) => assert_eq!(args.config, PathBuf::from("agent.toml")),
            other => panic!("expected Run, got {other:?}"),
        }
    }
}
