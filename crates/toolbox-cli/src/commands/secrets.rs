//! Secret provisioning command.

use anyhow::{Context, Result};
use colored::Colorize;
use std::sync::Arc;
use toolbox_core::config::load_spec_file;
use toolbox_core::{HostDirectory, HostKeyCheck, RunConfig, TerminalPrompt};
use toolbox_secrets::{validate_specs, ProvisionReport, SecretEngine};
use toolbox_services::{
    fetch_bootstrap_token, wait_until_ready, AcceptAnyHostKey, HostKeyPolicy, PinnedFingerprint,
    StartupCheck, TunnelSession,
};
use toolbox_types::SecretSpec;
use tracing::warn;

use crate::ui::progress;

/// Open the tunnel, provision every missing secret, close the tunnel.
///
/// Inputs are validated before anything touches the network. The tunnel is
/// closed on every path once it is open.
pub async fn run(config: RunConfig) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    let specs = load_spec_file(&config.spec_file).context("Failed to load secret specification")?;
    validate_specs(&specs).context("Invalid secret specification")?;

    let hosts = HostDirectory::load(&config.hosts_file).context("Failed to load host directory")?;
    let address = hosts
        .resolve(&config.host)
        .context("Failed to resolve host")?;
    let endpoint = config
        .endpoint(address)
        .context("Failed to locate SSH key")?;

    println!(
        "{} to {} ({})",
        "Connecting".green().bold(),
        config.host.cyan(),
        endpoint.dial_address()
    );
    let tunnel = TunnelSession::connect(
        &endpoint,
        &config.forward,
        host_key_policy(&config.host_key),
        StartupCheck::default(),
    )
    .await
    .context("Failed to open tunnel")?;

    let outcome = provision(&tunnel, &config, &specs).await;
    let closed = tunnel.close().await;

    let report = match (outcome, closed) {
        (Ok(report), Ok(())) => report,
        (Ok(_), Err(e)) => return Err(e).context("Failed to close tunnel"),
        (Err(e), closed) => {
            if let Err(close_err) = closed {
                warn!(error = %close_err, "tunnel teardown incomplete");
            }
            return Err(e);
        }
    };

    print_report(&report);
    Ok(())
}

async fn provision(
    tunnel: &TunnelSession,
    config: &RunConfig,
    specs: &[SecretSpec],
) -> Result<ProvisionReport> {
    let token = fetch_bootstrap_token(tunnel, &config.token)
        .await
        .context("Failed to fetch bootstrap token")?;

    let spinner = progress::spinner("Waiting for Vault to become ready");
    let ready = wait_until_ready(tunnel.local_addr(), &token, config.ready_timeout).await;
    spinner.finish_and_clear();
    let client = ready.context("Vault did not become ready")?;

    SecretEngine::new(Arc::new(client), Arc::new(TerminalPrompt))
        .with_order(config.prompt_order)
        .process_all(specs)
        .await
        .context("Failed to provision secrets")
}

fn host_key_policy(check: &HostKeyCheck) -> Arc<dyn HostKeyPolicy> {
    match check {
        HostKeyCheck::AcceptAny => Arc::new(AcceptAnyHostKey),
        HostKeyCheck::Fingerprint(fingerprint) => Arc::new(PinnedFingerprint::new(fingerprint)),
    }
}

fn print_report(report: &ProvisionReport) {
    for path in &report.generated {
        println!("  {} {}", "+".green().bold(), path);
    }
    for path in &report.skipped {
        println!("  {} {}", "=".dimmed(), path.dimmed());
    }
    println!(
        "{} Created {} secrets, {} already present",
        "✓".green().bold(),
        report.generated.len(),
        report.skipped.len()
    );
}
