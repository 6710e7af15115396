//! Subcommand implementations

use anyhow::{Context, Result, bail};
use log::{debug, error, info, warn};
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use notifier::http;
use notifier::{
    CycleOptions, CycleReport, GmailAuth, GmailClient, Identity, NotifierConfig, NotifierError,
    PollCycle, PushoverClient, SqliteStateStore, StateKind, StateStore, identity_from_event,
};

use crate::cli::TriggerArgs;

/// Open the state database, creating its directory on first use
pub fn open_store(config: &NotifierConfig) -> Result<Arc<SqliteStateStore>> {
    config::ensure_parent_dir(&config.db_path)?;
    let store = SqliteStateStore::open(&config.db_path)?;
    Ok(Arc::new(store))
}

fn gmail_auth(config: &NotifierConfig) -> GmailAuth {
    GmailAuth::new(
        config.google.client_id.clone(),
        config.google.client_secret.clone(),
        config.callback_url.clone(),
        http::agent(config.http_timeout),
    )
}

fn build_engine(config: &NotifierConfig, store: Arc<SqliteStateStore>) -> Result<PollCycle> {
    let gmail = GmailClient::new(gmail_auth(config), http::agent(config.http_timeout));
    let pushover = PushoverClient::new(
        config.pushover.api_key.clone(),
        config.pushover.user_key.clone(),
        http::agent_keeping_error_bodies(config.http_timeout),
    );
    let options = CycleOptions {
        concurrency: config.fetch_concurrency,
        ..CycleOptions::default()
    };

    PollCycle::new(store, Arc::new(gmail), Arc::new(pushover), options)
}

/// Resolve the mailbox from whichever trigger source was given
fn resolve_identity(trigger: &TriggerArgs) -> Result<Identity, NotifierError> {
    if let Some(email) = &trigger.email {
        return Identity::parse(email);
    }

    let payload = match (&trigger.event, &trigger.event_file) {
        (Some(event), _) => event.clone(),
        (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
            NotifierError::InvalidTrigger(format!("cannot read {}: {}", path.display(), e))
        })?,
        (None, None) => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| NotifierError::InvalidTrigger(format!("cannot read stdin: {}", e)))?;
            buf
        }
    };

    debug!("Raw event: {}", payload.trim());
    identity_from_event(&payload)
}

fn parse_email(email: &str) -> Result<Identity> {
    Identity::parse(email).map_err(Into::into)
}

pub fn run(config: &NotifierConfig, trigger: &TriggerArgs) -> Result<CycleReport> {
    let identity = resolve_identity(trigger)?;
    let engine = build_engine(config, open_store(config)?)?;
    Ok(engine.run_cycle(&identity)?)
}

pub fn watch(config: &NotifierConfig, trigger: &TriggerArgs, interval: u64) -> Result<()> {
    if interval == 0 {
        bail!("--interval must be at least 1 second");
    }
    let identity = resolve_identity(trigger)?;
    let engine = build_engine(config, open_store(config)?)?;
    let pause = Duration::from_secs(interval);

    info!("Watching {} every {}s", identity, interval);
    loop {
        // The engine logs every failure; retryable ones wait for the next tick
        if let Err(e) = engine.run_cycle(&identity)
            && !e.is_retryable()
        {
            error!("Stopping watch: {}", e);
            return Err(e.into());
        }
        std::thread::sleep(pause);
    }
}

pub fn set_query(config: &NotifierConfig, email: &str, query: &str) -> Result<()> {
    let identity = parse_email(email)?;
    if query.trim().is_empty() {
        bail!("Query must not be empty");
    }
    let store = open_store(config)?;
    store.put_query(identity.as_str(), query)?;
    info!("Query for {} set to \"{}\"", identity, query);
    Ok(())
}

pub fn show(config: &NotifierConfig, email: &str) -> Result<()> {
    let identity = parse_email(email)?;
    let store = open_store(config)?;

    let credential = store.get_credential(identity.as_str())?;
    let summary = serde_json::json!({
        "identity": identity.as_str(),
        "query": store.get_query(identity.as_str())?,
        "watermark": store.get_watermark(identity.as_str())?.map(|w| w.millis()),
        "credential": credential.map(|c| serde_json::json!({
            "has_refresh_token": c.can_refresh(),
            "expiry_date": c.expiry_date,
            "scope": c.scope,
        })),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

pub fn reset_watermark(config: &NotifierConfig, email: &str) -> Result<()> {
    let identity = parse_email(email)?;
    let store = open_store(config)?;
    store.delete(StateKind::Watermark, identity.as_str())?;
    info!("Watermark for {} cleared", identity);
    Ok(())
}

pub fn auth_url(config: &NotifierConfig, email: &str, open_browser: bool) -> Result<()> {
    let identity = parse_email(email)?;
    let url = gmail_auth(config).authorization_url(identity.as_str());
    println!("{}", url);

    if open_browser && let Err(e) = open::that(&url) {
        error!("Failed to open browser: {}. Please open the URL manually.", e);
    }
    Ok(())
}

pub fn authorize(config: &NotifierConfig, email: &str, code: &str) -> Result<()> {
    let identity = parse_email(email)?;
    let token = gmail_auth(config)
        .exchange_code(code.trim())
        .context("Failed to exchange authorization code")?;
    if !token.can_refresh() {
        warn!(
            "Google returned no refresh token for {}; cycles will fail once the access token expires",
            identity
        );
    }

    let store = open_store(config)?;
    store.put_credential(identity.as_str(), &token)?;
    info!("Credential for {} stored", identity);
    Ok(())
}
