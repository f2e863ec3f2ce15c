//! Status dashboard command.

use anyhow::Result;
use console::style;

use replydict_core::document::store::DocumentStore;
use replydict_types::keyword::KeywordStats;

use crate::state::AppState;

/// Display configuration and, when reachable, store statistics.
///
/// Connection failures are reported in the output rather than returned, so the
/// dashboard stays usable while a store is down.
pub async fn status(state: &AppState, json: bool) -> Result<()> {
    let keyword_stats: Result<KeywordStats, String> = match state.keyword_service().await {
        Ok(service) => service.stats().await.map_err(|e| e.to_string()),
        Err(e) => Err(format!("{e:#}")),
    };
    let collections: Result<Vec<String>, String> = match state.document_store().await {
        Ok(store) => store.collection_names().await.map_err(|e| e.to_string()),
        Err(e) => Err(format!("{e:#}")),
    };

    if json {
        let status = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "data_dir": state.data_dir.display().to_string(),
            "postgres": match &keyword_stats {
                Ok(stats) => serde_json::json!({ "ok": true, "stats": stats }),
                Err(e) => serde_json::json!({ "ok": false, "error": e }),
            },
            "mongo": match &collections {
                Ok(names) => serde_json::json!({ "ok": true, "collections": names }),
                Err(e) => serde_json::json!({ "ok": false, "error": e }),
            },
            "declared_collections": state.config.collections.iter().map(|c| &c.name).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!();
    println!("  {} replydict v{}", style("*").bold(), env!("CARGO_PKG_VERSION"));
    println!();

    println!("  {}", style("── Keyword dictionary ──").dim());
    match &keyword_stats {
        Ok(stats) => {
            println!("  Entries:          {}", style(stats.row_count).bold());
            println!("  Picture replies:  {}", stats.picture_reply_count);
            println!("  Sticker keywords: {}", stats.sticker_keyword_count);
            println!("  Total calls:      {}", stats.used_time_sum);
        }
        Err(e) => println!("  {} {}", style("unavailable:").red(), e),
    }
    println!();

    println!("  {}", style("── Document store ──").dim());
    match &collections {
        Ok(names) => {
            println!("  Database:    {}", style(&state.config.mongo.database).cyan());
            println!("  Collections: {}", style(names.len()).bold());
        }
        Err(e) => println!("  {} {}", style("unavailable:").red(), e),
    }
    println!("  Declared:    {}", state.config.collections.len());
    println!();

    println!("  {}", style("── System ──").dim());
    println!("  Data dir: {}", style(state.data_dir.display()).dim());
    println!();

    Ok(())
}
