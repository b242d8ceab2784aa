//! Broker clients from command line flags.

use anyhow::{ensure, Context, Result};
use mb_client::{AuthClient, HttpBrokerClient, HttpBrokerConfig, OidcAuthClient, OidcConfig};
use mb_harness::Tuning;
use std::sync::Arc;
use std::time::Duration;

use crate::NodeArgs;

/// Load tuning from `--config`, or the defaults.
pub fn load_tuning(args: &NodeArgs) -> Result<Tuning> {
    match &args.config {
        Some(path) => {
            tracing::debug!("loading tuning from {}", path.display());
            Tuning::from_file(path).context("could not load tuning")
        }
        None => Ok(Tuning::default()),
    }
}

/// One client per bootstrap node, all sharing a token client.
pub fn connect(args: &NodeArgs, tuning: &Tuning) -> Result<Vec<Arc<HttpBrokerClient>>> {
    ensure!(
        args.bootstrap_management_nodes.is_empty()
            || args.bootstrap_management_nodes.len() == args.bootstrap_nodes.len(),
        "--bootstrap-management-nodes has {} entries but --bootstrap-nodes has {}",
        args.bootstrap_management_nodes.len(),
        args.bootstrap_nodes.len()
    );

    let oidc = OidcConfig::new(
        args.node_auth_base_url.as_str(),
        args.node_auth_client_id.as_str(),
        args.node_auth_client_secret.as_str(),
    )
    .with_realm(&tuning.http.auth_realm)
    .with_timeout(Duration::from_secs(tuning.http.auth_timeout_secs));
    let auth: Arc<dyn AuthClient> =
        Arc::new(OidcAuthClient::new(oidc).context("could not create auth client")?);

    args.bootstrap_nodes
        .iter()
        .enumerate()
        .map(|(i, base_url)| -> Result<Arc<HttpBrokerClient>> {
            let mut config = HttpBrokerConfig::new(base_url.as_str())
                .with_request_timeout(Duration::from_secs(tuning.http.request_timeout_secs));
            if let Some(management) = args.bootstrap_management_nodes.get(i) {
                config = config.with_management_base_url(management.as_str());
            }
            tracing::debug!("node {}: {:?}", i, config);
            let client = HttpBrokerClient::new(config, Arc::clone(&auth))
                .with_context(|| format!("could not create client for `{}`", base_url))?;
            Ok(Arc::new(client))
        })
        .collect()
}
