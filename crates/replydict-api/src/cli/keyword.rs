//! Keyword dictionary CLI subcommands.
//!
//! Thin wrappers over `KeywordService`: they parse arguments, call the
//! service, and render results with the `replydict-core` formatters (or JSON).

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use replydict_core::format::ListedText;
use replydict_core::format::keyword::{
    entry_basic_info, entry_detailed_info, list_keyword, list_keyword_info, list_keyword_ranking,
    list_user_created_ranking, sticker_png_url,
};
use replydict_core::format::text::split;
use replydict_types::keyword::{KeywordEntry, NewKeyword};

use crate::state::AppState;

/// Keyword dictionary subcommands.
#[derive(Subcommand)]
pub enum KeywordCommand {
    /// Add a keyword/reply pair, overriding older entries with the same keyword.
    Add {
        /// Trigger text, or a sticker id with --sticker.
        keyword: String,

        /// Reply text, or a picture URL with --picture.
        reply: String,

        /// User id recorded as the creator.
        #[arg(long)]
        creator: String,

        /// Create the entry pinned.
        #[arg(long)]
        top: bool,

        /// The keyword is a sticker id.
        #[arg(long)]
        sticker: bool,

        /// The reply is a picture URL.
        #[arg(long)]
        picture: bool,
    },

    /// Add a pair given as one line, e.g. `rdict kw learn "hello|hi there"`.
    Learn {
        /// Keyword and reply joined by the splitter.
        line: String,

        /// Separator between keyword and reply.
        #[arg(long, default_value = "|")]
        splitter: String,

        /// User id recorded as the creator.
        #[arg(long)]
        creator: String,

        /// Create the entry pinned.
        #[arg(long)]
        top: bool,
    },

    /// Look up the reply for a keyword (counts as a call).
    Reply {
        keyword: String,

        /// Look up a sticker keyword.
        #[arg(long)]
        sticker: bool,
    },

    /// Entries whose keyword or reply contains the text.
    Search {
        text: String,

        /// Print every result instead of the short list.
        #[arg(long)]
        full: bool,
    },

    /// Entries with ids in an inclusive range.
    Range {
        start: i32,
        end: i32,

        /// Print every result instead of the short list.
        #[arg(long)]
        full: bool,
    },

    /// Detailed entries whose keyword or reply equals the text.
    Info {
        text: String,

        /// Print every result instead of the short list.
        #[arg(long)]
        full: bool,
    },

    /// Detailed entry by id.
    Show { id: i32 },

    /// Entries ranked by call count.
    Rank {
        /// Maximum rows to fetch.
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Creators ranked by number of entries created.
    Creators {
        /// Maximum rows to fetch.
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Live entries with the highest call count.
    MostUsed,

    /// Live entries with the lowest call count.
    LeastUsed,

    /// Soft-delete live entries with a keyword.
    Delete {
        keyword: String,

        /// Delete pinned entries instead of regular ones.
        #[arg(long)]
        top: bool,
    },

    /// Soft-delete a live entry by id.
    DeleteId {
        id: i32,

        /// Delete a pinned entry instead of a regular one.
        #[arg(long)]
        top: bool,
    },

    /// Creators with their entry counts.
    Pairs,

    /// Dictionary counters.
    Stats,

    /// Print the picture URL of a sticker id.
    StickerUrl { sticker_id: String },
}

/// Handle a keyword subcommand.
pub async fn handle_keyword_command(cmd: KeywordCommand, state: &AppState, json: bool) -> Result<()> {
    if let KeywordCommand::StickerUrl { sticker_id } = &cmd {
        let url = sticker_png_url(sticker_id);
        if json {
            print_json(&serde_json::json!({ "sticker_id": sticker_id, "url": url }))?;
        } else {
            println!("{url}");
        }
        return Ok(());
    }

    let service = state.keyword_service().await?;
    let names = &state.config.creator_names;
    let display = &state.config.display;

    match cmd {
        KeywordCommand::Add {
            keyword,
            reply,
            creator,
            top,
            sticker,
            picture,
        } => {
            let entry = service
                .add_keyword(NewKeyword {
                    keyword,
                    reply,
                    creator,
                    is_top: top,
                    is_sticker_kw: sticker,
                    is_pic_reply: picture,
                })
                .await?;
            print_added(&entry, json)
        }

        KeywordCommand::Learn {
            line,
            splitter,
            creator,
            top,
        } => {
            let (keyword, reply) = parse_pair(&line, &splitter)?;
            let entry = service
                .add_keyword(NewKeyword {
                    keyword,
                    reply,
                    creator,
                    is_top: top,
                    is_sticker_kw: false,
                    is_pic_reply: false,
                })
                .await?;
            print_added(&entry, json)
        }

        KeywordCommand::Reply { keyword, sticker } => {
            let replies = service.get_reply(&keyword, sticker).await?;
            if json {
                return print_json(&replies);
            }
            match replies.first() {
                Some(entry) => println!("{}", entry.reply),
                None => print_no_results(&format!("No reply for '{keyword}'.")),
            }
            Ok(())
        }

        KeywordCommand::Search { text, full } => {
            let entries = service.search(&text).await?;
            print_listing(&entries, list_keyword(&entries, display.list_limit), full, json)
        }

        KeywordCommand::Range { start, end, full } => {
            let entries = service.search_range(start, end).await?;
            print_listing(&entries, list_keyword(&entries, display.list_limit), full, json)
        }

        KeywordCommand::Info { text, full } => {
            let entries = service.info(&text).await?;
            let listed = list_keyword_info(&entries, names, display.info_limit);
            print_listing(&entries, listed, full, json)
        }

        KeywordCommand::Show { id } => {
            let entry = service
                .info_by_id(id)
                .await?
                .with_context(|| format!("Keyword entry #{id} not found"))?;
            if json {
                return print_json(&entry);
            }
            println!("{}", entry_detailed_info(&entry, names));
            Ok(())
        }

        KeywordCommand::Rank { limit } => {
            let ranked = service.used_rank(limit).await?;
            if json {
                return print_json(&ranked);
            }
            println!(
                "{}",
                list_keyword_ranking(&ranked, limit.unwrap_or(display.rank_limit))
            );
            Ok(())
        }

        KeywordCommand::Creators { limit } => {
            let ranks = service.creator_rank(limit).await?;
            if json {
                return print_json(&ranks);
            }
            println!(
                "{}",
                list_user_created_ranking(&ranks, names, limit.unwrap_or(display.rank_limit))
            );
            Ok(())
        }

        KeywordCommand::MostUsed => {
            let entries = service.most_used().await?;
            print_listing(&entries, list_keyword(&entries, display.list_limit), false, json)
        }

        KeywordCommand::LeastUsed => {
            let entries = service.least_used().await?;
            print_listing(&entries, list_keyword(&entries, display.list_limit), false, json)
        }

        KeywordCommand::Delete { keyword, top } => {
            let deleted = service.delete(&keyword, top).await?;
            print_deleted(&deleted, json)
        }

        KeywordCommand::DeleteId { id, top } => {
            let deleted = service.delete_by_id(id, top).await?;
            print_deleted(&deleted, json)
        }

        KeywordCommand::Pairs => {
            let pairs = service.creator_pairs().await?;
            if json {
                return print_json(&pairs);
            }
            if pairs.is_empty() {
                print_no_results("No keywords yet.");
                return Ok(());
            }

            let mut table = Table::new();
            table.load_preset(presets::UTF8_FULL_CONDENSED);
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec![
                Cell::new("Creator").fg(Color::White),
                Cell::new("Name").fg(Color::White),
                Cell::new("Created").fg(Color::White),
            ]);
            for pair in &pairs {
                let name = names.get(&pair.creator).map(String::as_str).unwrap_or("-");
                table.add_row(vec![
                    Cell::new(&pair.creator).fg(Color::Cyan),
                    Cell::new(name),
                    Cell::new(pair.created_count),
                ]);
            }
            println!("{table}");
            Ok(())
        }

        KeywordCommand::Stats => {
            let stats = service.stats().await?;
            if json {
                return print_json(&stats);
            }

            let mut table = Table::new();
            table.load_preset(presets::UTF8_FULL_CONDENSED);
            table.set_header(vec![
                Cell::new("Counter").fg(Color::White),
                Cell::new("Value").fg(Color::White),
            ]);
            table.add_row(vec![Cell::new("Entries"), Cell::new(stats.row_count)]);
            table.add_row(vec![Cell::new("Picture replies"), Cell::new(stats.picture_reply_count)]);
            table.add_row(vec![Cell::new("Sticker keywords"), Cell::new(stats.sticker_keyword_count)]);
            table.add_row(vec![Cell::new("Total calls"), Cell::new(stats.used_time_sum)]);
            println!("{table}");
            Ok(())
        }

        KeywordCommand::StickerUrl { .. } => unreachable!("handled above"),
    }
}

/// Split `line` into a keyword and a reply around the first `splitter`.
fn parse_pair(line: &str, splitter: &str) -> Result<(String, String)> {
    let mut parts = split(Some(line), splitter, 2).into_iter();
    match (parts.next().flatten(), parts.next().flatten()) {
        (Some(keyword), Some(reply)) => Ok((keyword, reply)),
        _ => bail!("Expected KEYWORD{splitter}REPLY, got '{line}'"),
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_no_results(message: &str) {
    println!();
    println!("  {} {message}", style("i").blue().bold());
    println!();
}

fn print_added(entry: &KeywordEntry, json: bool) -> Result<()> {
    if json {
        return print_json(entry);
    }
    println!();
    println!("  {} Added keyword", style("ok").green());
    println!();
    println!("{}", entry_basic_info(entry));
    println!();
    Ok(())
}

fn print_deleted(deleted: &[KeywordEntry], json: bool) -> Result<()> {
    if json {
        return print_json(deleted);
    }
    if deleted.is_empty() {
        print_no_results("Nothing to delete.");
        return Ok(());
    }
    println!();
    println!(
        "  {} Deleted {} entr{}",
        style("ok").green(),
        deleted.len(),
        if deleted.len() == 1 { "y" } else { "ies" }
    );
    println!();
    for entry in deleted {
        println!("{}\n", entry_basic_info(entry));
    }
    Ok(())
}

fn print_listing(entries: &[KeywordEntry], listed: ListedText, full: bool, json: bool) -> Result<()> {
    if json {
        return print_json(entries);
    }
    if entries.is_empty() {
        print_no_results("No matching keywords.");
        return Ok(());
    }
    println!("{}", if full { listed.full } else { listed.limited });
    Ok(())
}
