//! Sequenced document collection CLI subcommands.
//!
//! Documents are given as (extended) JSON on the command line and printed as
//! relaxed extended JSON.

use anyhow::{Context, Result, bail};
use bson::{Bson, Document};
use clap::Subcommand;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use replydict_core::document::sequence::SequenceAllocator;
use replydict_core::document::store::DocumentStore;
use replydict_types::document::COUNTER_COLLECTION;

use crate::state::AppState;

/// Document collection subcommands.
#[derive(Subcommand)]
pub enum DocumentCommand {
    /// Insert a JSON object, or every object of a JSON array in order.
    Insert {
        /// Collection name.
        collection: String,

        /// JSON object or array of objects. Must not contain `_seq`.
        document: String,
    },

    /// Find documents matching an equality filter.
    Find {
        /// Collection name.
        collection: String,

        /// JSON filter object.
        #[arg(long, default_value = "{}")]
        filter: String,

        /// Maximum number of documents to return.
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Show the last sequence value allocated for a collection.
    Counter {
        /// Collection name.
        collection: String,
    },

    /// List existing collections.
    List,

    /// Drop a collection together with its counter.
    Drop {
        /// Collection name.
        collection: String,

        /// Required; dropping cannot be undone.
        #[arg(long)]
        force: bool,
    },
}

/// Handle a document subcommand.
pub async fn handle_document_command(cmd: DocumentCommand, state: &AppState, json: bool) -> Result<()> {
    match cmd {
        DocumentCommand::Insert {
            collection,
            document,
        } => insert(state, &collection, &document, json).await,
        DocumentCommand::Find {
            collection,
            filter,
            limit,
        } => find(state, &collection, &filter, limit, json).await,
        DocumentCommand::Counter { collection } => counter(state, &collection, json).await,
        DocumentCommand::List => list(state, json).await,
        DocumentCommand::Drop { collection, force } => drop_collection(state, &collection, force, json).await,
    }
}

async fn insert(state: &AppState, collection: &str, input: &str, json: bool) -> Result<()> {
    let parsed = parse_documents(input)?;
    let coll = state.collection(collection).await?;

    let (ids, seqs) = match parsed {
        ParsedDocuments::One(document) => {
            let result = coll.insert_one(document).await?;
            (vec![result.inserted_id], vec![result.inserted_seq_id])
        }
        ParsedDocuments::Many(documents) => {
            let result = coll.insert_many(documents).await?;
            (result.inserted_ids, result.inserted_seq_ids)
        }
    };

    if json {
        let rows: Vec<serde_json::Value> = ids
            .into_iter()
            .zip(&seqs)
            .map(|(id, seq)| {
                serde_json::json!({
                    "inserted_id": id.into_relaxed_extjson(),
                    "inserted_seq_id": seq,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Inserted {} document(s) into '{}'",
        style("ok").green(),
        seqs.len(),
        style(collection).cyan()
    );
    for (id, seq) in ids.iter().zip(&seqs) {
        println!("     _seq {:>6}  _id {}", style(seq).bold(), id);
    }
    println!();
    Ok(())
}

async fn find(state: &AppState, collection: &str, filter: &str, limit: Option<i64>, json: bool) -> Result<()> {
    let filter = match parse_documents(filter)? {
        ParsedDocuments::One(filter) => filter,
        ParsedDocuments::Many(_) => bail!("Filter must be a JSON object"),
    };
    if let Some(limit) = limit.filter(|l| *l <= 0) {
        bail!("--limit must be positive, got {limit}");
    }
    let documents = match state.existing_collection(collection).await? {
        Some(coll) => coll.find(filter, limit, None).await?,
        None => Vec::new(),
    };

    let values: Vec<serde_json::Value> = documents.into_iter().map(document_to_json).collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&values)?);
    } else if values.is_empty() {
        println!();
        println!("  {} No documents in '{}'.", style("i").blue().bold(), style(collection).cyan());
        println!();
    } else {
        for value in &values {
            println!("{}", serde_json::to_string(value)?);
        }
    }
    Ok(())
}

async fn counter(state: &AppState, collection: &str, json: bool) -> Result<()> {
    let store = state.document_store().await?;
    let exists = store.collection_names().await?.iter().any(|n| n == collection);
    let current = SequenceAllocator::new(store).current(collection).await?;

    if json {
        let result = serde_json::json!({
            "collection": collection,
            "exists": exists,
            "sequenced": current.is_some(),
            "last_seq": current,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    match current {
        Some(seq) => println!("{seq}"),
        None if exists => println!(
            "  {} '{}' is not sequenced.",
            style("i").blue().bold(),
            style(collection).cyan()
        ),
        None => println!(
            "  {} No collection named '{}'.",
            style("i").blue().bold(),
            style(collection).cyan()
        ),
    }
    Ok(())
}

async fn list(state: &AppState, json: bool) -> Result<()> {
    let store = state.document_store().await?;
    let mut names: Vec<String> = store
        .collection_names()
        .await?
        .into_iter()
        .filter(|name| name != COUNTER_COLLECTION)
        .collect();
    names.sort();

    let mut rows = Vec::with_capacity(names.len());
    let allocator = SequenceAllocator::new(store);
    for name in names {
        let last_seq = allocator.current(&name).await?;
        rows.push((name, last_seq));
    }

    if json {
        let result: Vec<serde_json::Value> = rows
            .iter()
            .map(|(name, last_seq)| serde_json::json!({ "collection": name, "last_seq": last_seq }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!();
        println!("  {} No collections yet.", style("i").blue().bold());
        println!("     Insert one with: rdict doc insert <collection> '{{...}}'");
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Collection").fg(Color::White),
        Cell::new("Declared").fg(Color::White),
        Cell::new("Last _seq").fg(Color::White),
    ]);
    for (name, last_seq) in &rows {
        let declared = if state.config.collection(name).is_some() { "yes" } else { "-" };
        let last_seq = last_seq.map_or_else(|| "-".to_string(), |seq| seq.to_string());
        table.add_row(vec![
            Cell::new(name).fg(Color::Cyan),
            Cell::new(declared),
            Cell::new(last_seq),
        ]);
    }
    println!("{table}");
    Ok(())
}

async fn drop_collection(state: &AppState, collection: &str, force: bool, json: bool) -> Result<()> {
    if !force {
        bail!("Dropping '{collection}' deletes every document and resets its counter; pass --force");
    }
    let Some(coll) = state.existing_collection(collection).await? else {
        bail!("No collection named '{collection}'");
    };
    coll.drop_collection().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "dropped": collection }))?);
    } else {
        println!();
        println!("  {} Dropped '{}'", style("ok").green(), style(collection).cyan());
        println!();
    }
    Ok(())
}

#[derive(Debug)]
enum ParsedDocuments {
    One(Document),
    Many(Vec<Document>),
}

/// Parse an extended JSON object or array of objects.
fn parse_documents(input: &str) -> Result<ParsedDocuments> {
    let value: serde_json::Value = serde_json::from_str(input).context("Invalid JSON")?;
    let bson = Bson::try_from(value).context("Invalid extended JSON")?;

    match bson {
        Bson::Document(document) => Ok(ParsedDocuments::One(document)),
        Bson::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Bson::Document(document) => Ok(document),
                other => bail!("Element {index} is not an object: {other}"),
            })
            .collect::<Result<Vec<_>>>()
            .map(ParsedDocuments::Many),
        other => bail!("Expected a JSON object or array, got {other}"),
    }
}

fn document_to_json(document: Document) -> serde_json::Value {
    Bson::Document(document).into_relaxed_extjson()
}
