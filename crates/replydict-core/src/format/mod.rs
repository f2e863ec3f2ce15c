//! Plain-text presentation of dictionary data for chat replies.
//!
//! Every listing is produced twice: a `full` version and a `limited` version
//! that stops after a fixed number of entries, so callers can pick whichever
//! fits the chat platform's message size.

pub mod keyword;
pub mod text;

use std::collections::HashMap;
use std::hash::BuildHasher;

/// A listing rendered in full and truncated form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListedText {
    pub limited: String,
    pub full: String,
}

/// Resolves a creator's user id to a display name.
pub trait CreatorNames {
    fn display_name(&self, user_id: &str) -> Option<String>;
}

impl<S: BuildHasher> CreatorNames for HashMap<String, String, S> {
    fn display_name(&self, user_id: &str) -> Option<String> {
        self.get(user_id).cloned()
    }
}

/// Lookup that knows no names; listings fall back to a placeholder.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownNames;

impl CreatorNames for UnknownNames {
    fn display_name(&self, _user_id: &str) -> Option<String> {
        None
    }
}
