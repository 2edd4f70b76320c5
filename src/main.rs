use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;

use cityhall_inbox::compose::{ActionType, unfilled_placeholders};
use cityhall_inbox::config::InboxConfig;
use cityhall_inbox::desk::InboxDesk;
use cityhall_inbox::inbox::load_seed;

/// `cityhall-inbox [SEED_PATH] [ID [ACTION]]`
///
/// Lists the inbox. With an id, opens that item and prints a reply draft.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = InboxConfig::from_env()?;

    let mut args = std::env::args().skip(1);
    let seed_path = args
        .next()
        .map(PathBuf::from)
        .or_else(|| config.seed_path.clone())
        .context("No seed file given. Pass a path or set CITYHALL_SEED_PATH")?;

    let items = load_seed(&seed_path)
        .await
        .with_context(|| format!("Failed to load seed data from {}", seed_path.display()))?;

    eprintln!("🏛  City Hall Inbox v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   User: {} <{}>", config.user.name, config.user.email);
    eprintln!("   Generator: {}", config.generator);
    eprintln!("   Seed: {}", seed_path.display());

    let desk = InboxDesk::from_config(&config, items)?;

    let counts = desk.counts().await;
    eprintln!(
        "   Items: {} ({} unread, {} pending, {} responded, {} archived)\n",
        counts.total, counts.unread, counts.pending, counts.responded, counts.archived
    );

    let now = Utc::now();
    for item in desk.visible().await {
        let due = item
            .due_state(now)
            .map(|state| format!("  [{}]", state))
            .unwrap_or_default();
        println!(
            "{} {:<8} {:<10} {:<14} {:<24} {}{}",
            if item.is_read { " " } else { "*" },
            item.id,
            item.status.as_str(),
            item.department.as_str(),
            item.sender,
            item.subject,
            due,
        );
    }

    let Some(id) = args.next() else {
        return Ok(());
    };
    let action: ActionType = args
        .next()
        .as_deref()
        .unwrap_or("custom")
        .parse()
        .map_err(anyhow::Error::msg)?;

    desk.select(&id)
        .await
        .with_context(|| format!("No correspondence with id {}", id))?;

    let session = desk.open_compose(&id, action).await?;
    if let Some(result) = desk.settle().await {
        result?;
    }

    let session = session.lock().await;
    let draft = session.draft();
    println!("\n── {} ──", action.title());
    println!("To: {}", draft.recipient);
    println!("Subject: {}\n", draft.subject);
    println!("{}", draft.body);

    let placeholders = unfilled_placeholders(&draft.body);
    if !placeholders.is_empty() {
        eprintln!("\n   Fill in before sending: {}", placeholders.join(", "));
    }

    Ok(())
}
