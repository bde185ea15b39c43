use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::warn;

use agora_api::Ledger;
use agora_db::Database;
use agora_types::api::{Envelope, Request};

fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agora=info".into()),
        )
        .init();

    let db_path = std::env::var("AGORA_DB_PATH").unwrap_or_else(|_| "agora.db".into());
    let batch_path = std::env::args()
        .nth(1)
        .context("usage: agora <requests.json>")?;

    let db = Database::open(&PathBuf::from(&db_path))?;
    let ledger = Ledger::new(db);

    let content = std::fs::read_to_string(&batch_path)
        .with_context(|| format!("read batch file {batch_path}"))?;

    for envelope in run_batch(&ledger, &content) {
        println!("{}", serde_json::to_string(&envelope)?);
    }

    Ok(())
}

/// Parse the batch — a JSON array of request objects, or one object per
/// line — and dispatch each request in order. An unparseable request
/// yields a failure envelope and the batch keeps going.
fn run_batch(ledger: &Ledger, content: &str) -> Vec<Envelope> {
    let requests: Vec<serde_json::Result<Request>> =
        match serde_json::from_str::<Vec<Request>>(content) {
            Ok(batch) => batch.into_iter().map(Ok).collect(),
            Err(_) => content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(serde_json::from_str::<Request>)
                .collect(),
        };

    requests
        .into_iter()
        .map(|parsed| match parsed {
            Ok(request) => ledger.dispatch(&request),
            Err(err) => {
                warn!(%err, "unparseable request in batch");
                Envelope::failure()
            }
        })
        .collect()
}
