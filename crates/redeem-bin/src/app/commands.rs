//! One-shot operator commands (issue, inspect, stats).

use crate::app::init::{build_issuer, open_store};
use redeem_config_and_utils::{Config, Paths};
use redemption_engine::{CodeKind, CodeStore, DeliveryOutcome, Issuance};
use serde_json::{json, Value};

/// Issue a code for `identity` and print it with the delivery outcome.
pub async fn issue_once(
    config: &Config,
    paths: &Paths,
    identity: &str,
    kind: CodeKind,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(config, paths).await?;
    let issuer = build_issuer(config, store.clone())?;
    let result = issuer.issue(identity, kind).await;
    store.database().clone().close().await?;

    println!("{}", describe_issuance(&result?));
    Ok(())
}

/// Print the stored record for a code.
pub async fn inspect(
    config: &Config,
    paths: &Paths,
    code: &str,
    kind: CodeKind,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(config, paths).await?;
    let record = store.get(code, kind).await;
    store.database().clone().close().await?;

    match record? {
        Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        None => println!("No {} code {} on record", kind, code),
    }
    Ok(())
}

/// Print issued and used counts per kind.
pub async fn stats(config: &Config, paths: &Paths) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(config, paths).await?;
    let report = collect_stats(&store).await;
    store.database().clone().close().await?;

    println!("{}", serde_json::to_string_pretty(&report?)?);
    Ok(())
}

async fn collect_stats(store: &CodeStore) -> Result<Value, Box<dyn std::error::Error>> {
    let mut report = serde_json::Map::new();
    for kind in CodeKind::ALL {
        let (issued, used) = store.counts(kind).await?;
        report.insert(
            kind.as_str().to_string(),
            json!({ "issued": issued, "used": used, "unused": issued - used }),
        );
    }
    Ok(Value::Object(report))
}

fn describe_issuance(issuance: &Issuance) -> String {
    let status = if issuance.status.is_created() {
        "created"
    } else {
        "already issued"
    };
    let delivery = match &issuance.delivery {
        DeliveryOutcome::Failed { reason } => format!("failed ({})", reason),
        other => other.as_str().to_string(),
    };
    format!(
        "{} code {} ({})\n  delivery: {}",
        issuance.kind, issuance.code, status, delivery
    )
}
