//! Keyword entry listings, rankings and sticker URLs.

use std::fmt::Write;

use replydict_types::keyword::{CreatorRank, KeywordEntry, RankedKeyword};

use super::{CreatorNames, ListedText};

const STICKER_URL_PREFIX: &str = "https://sdl-stickershop.line.naver.jp/stickershop/v1/sticker/";
const STICKER_URL_SUFFIX: &str = "/android/sticker.png";
const INFO_SEPARATOR: &str = "====================\n";
const UNKNOWN_NAME: &str = "(unknown)";

/// Default entry count of the limited keyword list.
pub const DEFAULT_LIST_LIMIT: usize = 25;

/// Default entry count of the limited detailed listing.
pub const DEFAULT_INFO_LIMIT: usize = 2;

pub fn sticker_png_url(sticker_id: &str) -> String {
    format!("{STICKER_URL_PREFIX}{sticker_id}{STICKER_URL_SUFFIX}")
}

/// Extract the sticker id from a URL built by [`sticker_png_url`].
pub fn sticker_id(sticker_url: &str) -> String {
    sticker_url
        .replace(STICKER_URL_PREFIX, "")
        .replace(STICKER_URL_SUFFIX, "")
}

pub fn entry_basic_info(entry: &KeywordEntry) -> String {
    let keyword = if entry.is_sticker_kw {
        format!("(Sticker ID: {})", entry.keyword)
    } else {
        entry.keyword.clone()
    };
    let reply_type = if entry.is_pic_reply { "Picture URL" } else { "Text" };

    format!(
        "ID: {}\nKeyword: {keyword}\nReply {reply_type}: {}",
        entry.id, entry.reply
    )
}

pub fn entry_detailed_info(entry: &KeywordEntry, names: &impl CreatorNames) -> String {
    let flag = |on: bool, label: &str| if on { format!("[ {label} ]") } else { "[ - ]".to_string() };
    let name = names
        .display_name(&entry.creator)
        .unwrap_or_else(|| UNKNOWN_NAME.to_string());

    let mut text = entry_basic_info(entry);
    text.push_str("\n\nAttribute: \n");
    let _ = write!(
        text,
        "{} {} {}\n\n",
        flag(entry.admin, "PINNED"),
        flag(entry.overridden, "OVERRIDE"),
        flag(entry.deleted, "DELETED")
    );
    let _ = write!(text, "Called count: {}\n\n", entry.used_time);
    let _ = writeln!(text, "Creator Name: {name}");
    let _ = write!(text, "Creator user id: {}", entry.creator);
    text
}

/// One line per entry: id, keyword, and `(OVR)`/`(TOP)`/`(DEL)` markers.
pub fn list_keyword(entries: &[KeywordEntry], limit: usize) -> ListedText {
    let count = entries.len();
    let mut listed = ListedText {
        limited: String::new(),
        full: format!("Count of results: {count}\n\n"),
    };

    for (index, entry) in entries.iter().enumerate() {
        let keyword = if entry.is_sticker_kw {
            format!("(Sticker {})", entry.keyword)
        } else {
            entry.keyword.clone()
        };
        let line = format!(
            "ID: {} - {keyword} {}{}{}\n",
            entry.id,
            if entry.overridden { "(OVR)" } else { "" },
            if entry.admin { "(TOP)" } else { "" },
            if entry.deleted { "(DEL)" } else { "" },
        );
        listed.full.push_str(&line);

        if index < limit {
            listed.limited.push_str(&line);
        } else if index == limit {
            let _ = write!(listed.limited, "...({} more)", count - limit);
        }
    }

    listed
}

/// Detailed blocks separated by a rule line.
pub fn list_keyword_info(entries: &[KeywordEntry], names: &impl CreatorNames, limit: usize) -> ListedText {
    let count = entries.len();
    let mut listed = ListedText {
        limited: String::new(),
        full: format!("Count of results: {count}\n"),
    };

    for (index, entry) in entries.iter().enumerate() {
        let block = format!("{INFO_SEPARATOR}{}\n", entry_detailed_info(entry, names));
        listed.full.push_str(&block);

        if index < limit {
            listed.limited.push_str(&block);
        } else if index == limit {
            listed.limited.push_str(INFO_SEPARATOR);
            let _ = write!(listed.limited, "{} not displayed.", count - limit);
        }
    }

    listed
}

pub fn list_keyword_ranking(ranked: &[RankedKeyword], limit: i64) -> String {
    let mut text = format!("Top {limit} called pair: ");
    for row in ranked {
        let keyword = if row.entry.is_sticker_kw {
            format!("(Sticker ID {})", row.entry.keyword)
        } else {
            row.entry.keyword.clone()
        };
        let _ = write!(
            text,
            "\nNo.{} - ID: {} - {keyword} ({})",
            row.used_rank, row.entry.id, row.entry.used_time
        );
    }
    text
}

pub fn list_user_created_ranking(ranks: &[CreatorRank], names: &impl CreatorNames, limit: i64) -> String {
    let mut text = format!("Top {limit} creative user: ");
    for row in ranks {
        let name = names
            .display_name(&row.creator)
            .unwrap_or_else(|| row.creator.clone());
        let _ = write!(text, "\nNo.{} - {name} ({})", row.rank, row.created_count);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::UnknownNames;
    use std::collections::HashMap;

    fn entry(id: i32, keyword: &str) -> KeywordEntry {
        KeywordEntry {
            id,
            keyword: keyword.to_string(),
            reply: format!("reply {id}"),
            deleted: false,
            overridden: false,
            admin: false,
            used_time: id * 2,
            creator: "U1".to_string(),
            is_pic_reply: false,
            is_sticker_kw: false,
        }
    }

    #[test]
    fn test_sticker_url_round_trip() {
        let url = sticker_png_url("12345");
        assert_eq!(
            url,
            "https://sdl-stickershop.line.naver.jp/stickershop/v1/sticker/12345/android/sticker.png"
        );
        assert_eq!(sticker_id(&url), "12345");
    }

    #[test]
    fn test_entry_basic_info_text_and_sticker() {
        assert_eq!(
            entry_basic_info(&entry(3, "hello")),
            "ID: 3\nKeyword: hello\nReply Text: reply 3"
        );

        let sticker = KeywordEntry {
            is_sticker_kw: true,
            is_pic_reply: true,
            ..entry(4, "998")
        };
        assert_eq!(
            entry_basic_info(&sticker),
            "ID: 4\nKeyword: (Sticker ID: 998)\nReply Picture URL: reply 4"
        );
    }

    #[test]
    fn test_entry_detailed_info_flags_and_creator() {
        let pinned = KeywordEntry {
            admin: true,
            deleted: true,
            ..entry(1, "hi")
        };
        let names = HashMap::from([("U1".to_string(), "Alice".to_string())]);
        let text = entry_detailed_info(&pinned, &names);

        assert!(text.contains("[ PINNED ] [ - ] [ DELETED ]\n\n"));
        assert!(text.contains("Called count: 2\n\n"));
        assert!(text.contains("Creator Name: Alice\n"));
        assert!(text.ends_with("Creator user id: U1"));

        let anonymous = entry_detailed_info(&pinned, &UnknownNames);
        assert!(anonymous.contains("Creator Name: (unknown)"));
    }

    #[test]
    fn test_list_keyword_truncates_limited() {
        let entries: Vec<KeywordEntry> = (1..=4).map(|i| entry(i, &format!("k{i}"))).collect();
        let listed = list_keyword(&entries, 2);

        assert!(listed.full.starts_with("Count of results: 4\n\n"));
        assert_eq!(listed.full.lines().filter(|l| l.starts_with("ID:")).count(), 4);
        assert_eq!(
            listed.limited,
            "ID: 1 - k1 \nID: 2 - k2 \n...(2 more)"
        );
    }

    #[test]
    fn test_list_keyword_markers_and_no_trailer_when_within_limit() {
        let entries = vec![KeywordEntry {
            overridden: true,
            admin: true,
            deleted: true,
            is_sticker_kw: true,
            ..entry(9, "777")
        }];
        let listed = list_keyword(&entries, DEFAULT_LIST_LIMIT);
        assert_eq!(listed.limited, "ID: 9 - (Sticker 777) (OVR)(TOP)(DEL)\n");
    }

    #[test]
    fn test_list_keyword_info_limited_footer() {
        let entries: Vec<KeywordEntry> = (1..=3).map(|i| entry(i, "k")).collect();
        let listed = list_keyword_info(&entries, &UnknownNames, DEFAULT_INFO_LIMIT);

        assert!(listed.full.starts_with("Count of results: 3\n"));
        assert_eq!(listed.full.matches(INFO_SEPARATOR).count(), 3);
        assert_eq!(listed.limited.matches(INFO_SEPARATOR).count(), 3);
        assert!(listed.limited.ends_with("1 not displayed."));
        assert!(!listed.limited.contains("ID: 3"));
    }

    #[test]
    fn test_list_keyword_ranking() {
        let ranked = vec![
            RankedKeyword { entry: entry(2, "b"), used_rank: 1 },
            RankedKeyword {
                entry: KeywordEntry { is_sticker_kw: true, ..entry(1, "55") },
                used_rank: 2,
            },
        ];
        assert_eq!(
            list_keyword_ranking(&ranked, 2),
            "Top 2 called pair: \nNo.1 - ID: 2 - b (4)\nNo.2 - ID: 1 - (Sticker ID 55) (2)"
        );
    }

    #[test]
    fn test_list_user_created_ranking_falls_back_to_id() {
        let ranks = vec![
            CreatorRank { rank: 1, creator: "U1".to_string(), created_count: 5 },
            CreatorRank { rank: 2, creator: "U2".to_string(), created_count: 1 },
        ];
        let names = HashMap::from([("U1".to_string(), "Alice".to_string())]);
        assert_eq!(
            list_user_created_ranking(&ranks, &names, 10),
            "Top 10 creative user: \nNo.1 - Alice (5)\nNo.2 - U2 (1)"
        );
    }
}
