//! Service initialization.

use crate::app::shutdown::shutdown_signal;
use delivery_relay::{WebhookConfig, WebhookDelivery};
use redeem_config_and_utils::{
    Config, CoreError, DeliveryConfig, DerivationConfig, DerivationSchemeName, Paths,
};
use redeem_database::AsyncDatabase;
use redeem_http::AppState;
use redemption_engine::{CodeStore, DeliveryChannel, DerivationScheme, DisabledDelivery, Issuer};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Run the HTTP service until Ctrl-C or SIGTERM.
pub async fn run_server(config: Config, paths: Paths) -> Result<(), Box<dyn std::error::Error>> {
    run_until(config, paths, shutdown_signal()).await
}

pub(crate) async fn run_until<F>(
    config: Config,
    paths: Paths,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!(
        base_dir = %paths.base_dir().display(),
        scheme = config.derivation.scheme.as_str(),
        delivery = config.delivery.as_ref().map(|d| d.url.as_str()).unwrap_or("disabled"),
        trigger_enabled = config.trigger_token.is_some(),
        "Starting redeemd"
    );

    let store = open_store(&config, &paths).await?;
    let issuer = build_issuer(&config, store.clone())?;
    let state = AppState::new(store.clone(), issuer, config.trigger_token.clone());

    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind {}: {}", addr, e))?;

    let server_result = redeem_http::serve(listener, state, shutdown).await;

    // Handlers are gone once serve returns; nothing else holds the store.
    if let Err(e) = store.database().clone().close().await {
        warn!(error = %e, "Failed to close database cleanly");
    }
    info!("redeemd stopped");

    server_result.map_err(|e| e.into())
}

/// Open the database under `paths` and wrap it in a bounded store.
pub(crate) async fn open_store(
    config: &Config,
    paths: &Paths,
) -> Result<CodeStore, Box<dyn std::error::Error>> {
    paths.ensure_dirs()?;
    let db = AsyncDatabase::open(&paths.database_file())
        .await
        .map_err(|e| format!("Failed to open database: {}", e))?;
    info!(path = %paths.database_file().display(), "Database opened");
    Ok(CodeStore::new(db, config.store_timeout()))
}

pub(crate) fn build_issuer(
    config: &Config,
    store: CodeStore,
) -> Result<Issuer, Box<dyn std::error::Error>> {
    let scheme = derivation_scheme(&config.derivation)?;
    info!(scheme = scheme.name(), "Code derivation ready");
    let delivery = delivery_channel(config.delivery.as_ref())?;
    Ok(Issuer::new(scheme, store, delivery))
}

pub(crate) fn derivation_scheme(config: &DerivationConfig) -> Result<DerivationScheme, CoreError> {
    match config.scheme {
        DerivationSchemeName::Legacy => Ok(DerivationScheme::Legacy),
        DerivationSchemeName::Keyed => config
            .secret
            .as_deref()
            .map(|secret| DerivationScheme::keyed(secret.as_bytes()))
            .ok_or_else(|| CoreError::Config("keyed derivation requires a secret".to_string())),
    }
}

pub(crate) fn delivery_channel(
    config: Option<&DeliveryConfig>,
) -> Result<Arc<dyn DeliveryChannel>, delivery_relay::RelayError> {
    let Some(config) = config else {
        info!("No delivery relay configured, issued codes will not be sent");
        return Ok(Arc::new(DisabledDelivery));
    };

    let webhook = WebhookDelivery::new(WebhookConfig {
        url: config.url.clone(),
        auth_token: config.auth_token.clone(),
        timeout_secs: config.timeout_secs,
    })?;
    info!(url = %webhook.url(), "Delivery relay configured");
    Ok(Arc::new(webhook))
}

#[cfg(test)]
mod tests {
    use super::*;
    use redemption_engine::{CodeKind, DeliveryError};
    use tempfile::tempdir;

    #[test]
    fn legacy_scheme_is_default() {
        let scheme = derivation_scheme(&DerivationConfig::default()).unwrap();
        assert_eq!(scheme.name(), "legacy");
        assert_eq!(scheme.derive("U1", CodeKind::Beta), "316ca0efda62");
    }

    #[test]
    fn keyed_scheme_uses_secret() {
        let config = DerivationConfig {
            scheme: DerivationSchemeName::Keyed,
            secret: Some("pepper".to_string()),
        };
        let scheme = derivation_scheme(&config).unwrap();
        assert_eq!(scheme.name(), "keyed");
        assert_eq!(scheme.derive("U1", CodeKind::Beta), "989f1d47a1d3");
    }

    #[test]
    fn keyed_scheme_without_secret_fails() {
        let config = DerivationConfig {
            scheme: DerivationSchemeName::Keyed,
            secret: None,
        };
        assert!(matches!(derivation_scheme(&config), Err(CoreError::Config(_))));
    }

    #[tokio::test]
    async fn missing_relay_disables_delivery() {
        let channel = delivery_channel(None).unwrap();
        let result = channel.send("U1", CodeKind::Beta, "hello").await;
        assert_eq!(result, Err(DeliveryError::NotConfigured));
    }

    #[tokio::test]
    async fn server_starts_and_stops_cleanly() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        let config = Config {
            bind_addr: "127.0.0.1:0".to_string(),
            ..Config::default()
        };

        run_until(config, paths.clone(), async {}).await.unwrap();
        assert!(paths.database_file().exists());
    }

    #[tokio::test]
    async fn bad_bind_address_fails_startup() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        let config = Config {
            bind_addr: "not-an-address".to_string(),
            ..Config::default()
        };

        assert!(run_until(config, paths, async {}).await.is_err());
    }
}
