//! Intent classification for free-text chat messages
//!
//! Keyword based, case-insensitive, English plus the original Traditional
//! Chinese trigger words. Classification is pure; acting on the intent is the
//! handler's job.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Refers to an entry in a list shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    /// 1-based position
    Index(usize),
    Name(String),
}

impl Selector {
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().trim_start_matches('#').trim();
        if raw.is_empty() {
            return None;
        }
        match raw.parse::<usize>() {
            Ok(index) if index >= 1 => Some(Selector::Index(index)),
            _ => Some(Selector::Name(raw.to_string())),
        }
    }

    /// Pick the selected item out of `items`, matching names case-insensitively
    pub fn pick<'a, T>(&self, items: &'a [T], name_of: impl Fn(&T) -> &str) -> Option<&'a T> {
        match self {
            Selector::Index(index) => index.checked_sub(1).and_then(|i| items.get(i)),
            Selector::Name(name) => items
                .iter()
                .find(|item| name_of(item).to_lowercase() == name.to_lowercase()),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Index(index) => write!(f, "#{index}"),
            Selector::Name(name) => write!(f, "{name}"),
        }
    }
}

/// What the user asked for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", content = "selector", rename_all = "snake_case")]
pub enum Intent {
    FindNearby,
    ListFavorites,
    AddFavorite(Selector),
    RemoveFavorite(Selector),
    Unrecognized,
}

const REMOVE_KEYWORDS: &[&str] = &["取消收藏", "移除", "remove", "delete", "unsave"];
const ADD_KEYWORDS: &[&str] = &["收藏", "save", "add"];
const FAVORITE_WORDS: &[&str] = &["favourites", "favorites", "favourite", "favorite", "fav"];
const LIST_KEYWORDS: &[&str] = &["我的最愛", "最愛", "favorites", "favourites", "my list"];
const NEARBY_KEYWORDS: &[&str] = &[
    "廁所", "洗手間", "toilet", "toilets", "restroom", "restrooms", "bathroom", "washroom", "wc",
    "loo", "nearby",
];

/// Strip a leading keyword. ASCII keywords must end at a word boundary so
/// "address" does not read as "add".
fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let head = text.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    let rest = &text[keyword.len()..];
    if keyword.is_ascii() && !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim())
}

/// Whether `keyword` occurs in `lower`. ASCII keywords must stand as whole
/// words so "balloon" does not read as "loo"; CJK text has no word breaks and
/// matches anywhere.
fn contains_keyword(lower: &str, keyword: &str) -> bool {
    if !keyword.is_ascii() {
        return lower.contains(keyword);
    }
    let is_word = |c: char| c.is_alphanumeric();
    lower.match_indices(keyword).any(|(start, _)| {
        let before = lower[..start].chars().next_back();
        let after = lower[start + keyword.len()..].chars().next();
        !before.is_some_and(is_word) && !after.is_some_and(is_word)
    })
}

fn strip_any<'a>(text: &'a str, keywords: &[&str]) -> Option<&'a str> {
    keywords.iter().find_map(|k| strip_keyword(text, k))
}

/// "save favorite 2" and "save 2" select the same thing
fn selector_after_command(rest: &str) -> Option<Selector> {
    let rest = strip_any(rest, FAVORITE_WORDS).unwrap_or(rest);
    Selector::parse(rest)
}

/// Classify a chat message into an [`Intent`]
#[must_use]
pub fn classify(text: &str) -> Intent {
    let text = text.trim();
    if text.is_empty() {
        return Intent::Unrecognized;
    }

    if let Some(rest) = strip_any(text, REMOVE_KEYWORDS) {
        return selector_after_command(rest)
            .map(Intent::RemoveFavorite)
            .unwrap_or(Intent::Unrecognized);
    }

    if let Some(rest) = strip_any(text, ADD_KEYWORDS) {
        return selector_after_command(rest)
            .map(Intent::AddFavorite)
            .unwrap_or(Intent::Unrecognized);
    }

    let lower = text.to_lowercase();
    if LIST_KEYWORDS.iter().any(|k| contains_keyword(&lower, k)) {
        return Intent::ListFavorites;
    }

    if NEARBY_KEYWORDS.iter().any(|k| contains_keyword(&lower, k)) {
        return Intent::FindNearby;
    }

    Intent::Unrecognized
}
