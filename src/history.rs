//! Conversation history commands.
//!
//! CLI entry points over [`ConversationStore`]: list, show, rename, delete.
//! The HTTP server calls the store directly and renders the same
//! [`ConversationItem`] shape as JSON.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::models::ConversationItem;
use crate::store::open_store;

/// Lists the newest conversations (bounded by `limit` or the configured default).
pub async fn run_list(config: &Config, limit: Option<i64>) -> Result<()> {
    let limit = limit.unwrap_or(config.history.default_limit);
    if limit < 1 {
        bail!("--limit must be >= 1, got {}", limit);
    }
    let store = open_store(config).await?;
    let items: Vec<ConversationItem> = store
        .list(limit)
        .await?
        .into_iter()
        .map(|c| c.into_item())
        .collect();
    store.pool().close().await;

    if items.is_empty() {
        println!("No conversations.");
        return Ok(());
    }

    for item in &items {
        println!(
            "{}  {}  {}  ({}, {} pages)",
            item.id,
            item.created_at,
            item.title,
            item.filename.as_deref().unwrap_or("-"),
            item.page_count
                .map(|p| p.to_string())
                .unwrap_or_else(|| "?".to_string()),
        );
    }
    println!("{} conversation(s)", items.len());
    Ok(())
}

pub async fn run_show(config: &Config, id: &str) -> Result<()> {
    let store = open_store(config).await?;
    let item = store.get(id).await?.into_item();
    store.pool().close().await;

    println!("--- Conversation ---");
    println!("id:         {}", item.id);
    println!("title:      {}", item.title);
    if let Some(ref name) = item.filename {
        println!("filename:   {}", name);
    }
    if let Some(pages) = item.page_count {
        println!("pages:      {}", pages);
    }
    println!("created_at: {}", item.created_at);
    println!();
    println!("--- Summary ---");
    println!("{}", item.response);
    Ok(())
}

pub async fn run_rename(config: &Config, id: &str, name: &str) -> Result<()> {
    let store = open_store(config).await?;
    let record = store.rename(id, name).await?;
    store.pool().close().await;

    println!("renamed {} to \"{}\"", record.id, record.title);
    Ok(())
}

pub async fn run_delete(config: &Config, id: &str) -> Result<()> {
    let store = open_store(config).await?;
    store.delete(id).await?;
    store.pool().close().await;

    println!("deleted {}", id);
    Ok(())
}
