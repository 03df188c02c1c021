//! Entry point for the `agent` binary: the identity and network-map agent
//! for a single permissioned-zone node.
mod cli;
mod config;

use std::sync::Arc;

use clap::Parser;
use snafu::{ResultExt, Snafu};
use tracing_subscriber::EnvFilter;
use zone_pki::{
    CertificatePair,
    issuer::{self, CertificateAuthority},
    keys::{CertificateKeypair, ecdsa},
    role::CertificateType,
};

use cli::{Cli, Command, GenerateRootArgs, IssueCertArgs, RunArgs};
use config::Settings;

#[derive(Debug, Snafu)]
enum AgentError {
    #[snafu(display("failed to load settings"))]
    Settings { source: config::SettingsError },

    #[snafu(display("failed to generate root CA"))]
    GenerateRoot { source: issuer::IssuerError<ecdsa::Error> },

    #[snafu(display("failed to generate key pair"))]
    GenerateKeyPair { source: ecdsa::Error },

    #[snafu(display("\"{cert_type}\" is not a known certificate type"))]
    UnknownCertificateType { cert_type: String },

    #[snafu(display("failed to read {path:?}"))]
    ReadFile { source: std::io::Error, path: std::path::PathBuf },

    #[snafu(display("failed to parse trust anchor certificate"))]
    ParseTrustAnchor { source: zone_pki::factory::FactoryError },

    #[snafu(display("failed to load issuer certificate and key pair"))]
    LoadIssuerKeyPair { source: zone_pki::CertificatePairError<ecdsa::Error> },

    #[snafu(display("failed to write certificate and key pair to disk"))]
    WriteKeyPair { source: zone_pki::CertificatePairError<ecdsa::Error> },

    #[snafu(display("failed to issue certificate"))]
    IssueCertificate { source: issuer::IssuerError<ecdsa::Error> },

    #[snafu(display("failed to subscribe to the network map"))]
    Subscribe { source: zone_netmap::updater::UpdaterError },
}

type Result<T, E = AgentError> = std::result::Result<T, E>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run(args).await,
        Command::GenerateRoot(args) => generate_root(args),
        Command::IssueCert(args) => issue_cert(args),
    }
}

fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(args: RunArgs) -> Result<()> {
    let settings = Settings::from_file(&args.config).context(SettingsSnafu)?;
    init_logging(&settings.log_level);

    tracing::info!(network_map_url = %settings.network_map_url, "starting zone agent");

    let trust_anchor_pem = std::fs::read_to_string(&settings.trust_anchor_path).context(ReadFileSnafu {
        path: settings.trust_anchor_path.clone(),
    })?;
    let trust_anchor = zone_pki::factory::parse_pem(&trust_anchor_pem).context(ParseTrustAnchorSnafu)?;

    let client = zone_netmap::client::NetworkMapClient::new(
        settings
            .network_map_url
            .parse()
            .expect("network_map_url must be a valid URL"),
    );
    let cache: Arc<dyn zone_netmap::cache::Cache> = Arc::new(zone_netmap::cache::InMemoryCache::new());
    let watcher: Arc<dyn zone_netmap::watcher::FileWatcher> =
        Arc::new(zone_netmap::watcher::DirectoryWatcher::new(&settings.node_info_dir));

    let updater = zone_netmap::updater::NetworkMapUpdater::new(
        Some(client),
        cache,
        watcher,
        trust_anchor,
        settings.current_parameters_hash.clone(),
        settings.base_directory.clone(),
    );
    let mut feed = updater.subscribe_to_network_map().await.context(SubscribeSnafu)?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received shutdown signal");
        }
        () = poll_feed(&mut feed) => {}
    }

    updater.close().await;
    Ok(())
}

async fn poll_feed(feed: &mut zone_netmap::updater::DataFeed) {
    while let Some(map) = feed.next().await {
        tracing::info!(
            node_count = map.node_info_hashes.len(),
            network_parameters_hash = %map.network_parameters_hash,
            "network map updated"
        );
    }
}

fn generate_root(args: GenerateRootArgs) -> Result<()> {
    let ca = CertificateAuthority::<ecdsa::SigningKey>::create_self_signed_root(
        &args.subject,
        None,
        None,
    )
    .context(GenerateRootSnafu)?;

    ca.to_files(&args.cert_out, &args.key_out).context(WriteKeyPairSnafu)?;

    tracing::info!(subject = %args.subject, "generated root CA");
    Ok(())
}

fn issue_cert(args: IssueCertArgs) -> Result<()> {
    let cert_type = parse_certificate_type(&args.cert_type)?;

    let issuer_pair = CertificatePair::<ecdsa::SigningKey>::from_files(&args.issuer_cert, &args.issuer_key)
        .context(LoadIssuerKeyPairSnafu)?;

    let subject_key = ecdsa::SigningKey::new().context(GenerateKeyPairSnafu)?;
    let subject_spki = issuer::subject_public_key_info::<_, ecdsa::Error>(&subject_key.verifying_key())
        .context(IssueCertificateSnafu)?;

    let window = issuer::compute_validity_window::<ecdsa::Error>(
        issuer::DEFAULT_VALIDITY,
        issuer::DEFAULT_VALIDITY,
        Some((
            issuer_pair.certificate().tbs_certificate.validity.not_before.to_system_time().into(),
            issuer_pair.certificate().tbs_certificate.validity.not_after.to_system_time().into(),
        )),
    )
    .context(IssueCertificateSnafu)?;

    let certificate = issuer::issue_certificate_with_signer::<_, _, ecdsa::Error>(
        cert_type,
        issuer_pair.certificate().tbs_certificate.subject.clone(),
        issuer_pair.key_pair().signing_key(),
        &args.subject,
        subject_spki,
        window,
        None,
    )
    .context(IssueCertificateSnafu)?;

    CertificatePair::new(certificate, subject_key)
        .to_files(&args.cert_out, &args.key_out)
        .context(WriteKeyPairSnafu)?;

    tracing::info!(subject = %args.subject, cert_type = %args.cert_type, "issued certificate");
    Ok(())
}

fn parse_certificate_type(raw: &str) -> Result<CertificateType> {
    match raw {
        "intermediate-ca" => Ok(CertificateType::IntermediateCa),
        "node-ca" => Ok(CertificateType::NodeCa),
        "tls" => Ok(CertificateType::Tls),
        "legal-identity" => Ok(CertificateType::LegalIdentity),
        "network-map" => Ok(CertificateType::NetworkMap),
        "service-identity" => Ok(CertificateType::ServiceIdentity),
        "confidential-legal-identity" => Ok(CertificateType::ConfidentialLegalIdentity),
        other => UnknownCertificateTypeSnafu { cert_type: other.to_owned() }.fail(),
    }
}
