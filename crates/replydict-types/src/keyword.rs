//! Keyword dictionary domain types.
//!
//! A keyword entry maps a trigger (text or a sticker id) to a reply (text or
//! a picture URL). Entries are never physically removed: deleting sets the
//! `deleted` flag, and adding a keyword that already exists marks the older
//! entries as overridden.

use serde::{Deserialize, Serialize};

/// One row of the keyword dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordEntry {
    pub id: i32,
    pub keyword: String,
    pub reply: String,
    /// Soft-delete flag.
    pub deleted: bool,
    /// Superseded by a newer entry with the same keyword.
    #[serde(rename = "override")]
    pub overridden: bool,
    /// Pinned entry created by an administrator; sorted first on lookup.
    pub admin: bool,
    /// Number of times this entry answered a lookup.
    pub used_time: i32,
    /// User id of the creator.
    pub creator: String,
    /// The reply is a picture URL rather than text.
    pub is_pic_reply: bool,
    /// The keyword is a sticker id rather than text.
    pub is_sticker_kw: bool,
}

/// Input for creating a keyword entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewKeyword {
    pub keyword: String,
    pub reply: String,
    pub creator: String,
    /// Create the entry pinned (`admin = TRUE`).
    #[serde(default)]
    pub is_top: bool,
    #[serde(default)]
    pub is_sticker_kw: bool,
    #[serde(default)]
    pub is_pic_reply: bool,
}

/// A keyword entry with its rank by call count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedKeyword {
    #[serde(flatten)]
    pub entry: KeywordEntry,
    pub used_rank: i64,
}

/// A creator ranked by the number of entries they created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorRank {
    pub rank: i64,
    pub creator: String,
    pub created_count: i64,
}

/// A creator with the number of entries they created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorCount {
    pub creator: String,
    pub created_count: i64,
}

/// Aggregate statistics over the whole dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordStats {
    pub row_count: i64,
    pub picture_reply_count: i64,
    pub sticker_keyword_count: i64,
    pub used_time_sum: i64,
}
