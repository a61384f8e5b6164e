//! Purpose: Public value types returned by the gateway client.
//! Exports: `Resolution`, `OwnedLibrary`, `OwnedGame`, `ProfileSummary`, `GameDetail`, `ReviewEntry`, `SearchHit`.
//! Role: Plain owned data handed to callers; the client keeps no reference to any of it.
//! Invariants: Normalized records are total; "absent" is `None` or empty, never a missing key.
//! Invariants: Loosely-typed upstream schemas stay `Value`-based and unvalidated beyond existence.

use serde_json::{Map, Value};

/// How many reviews an operation fetches when the caller has no opinion.
pub const DEFAULT_REVIEW_COUNT: usize = 5;

/// Outcome of resolving a raw identity or vanity name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Resolution {
    /// Canonical 17-digit SteamID64.
    pub steam_id: String,
    /// Whether a network resolution was required to obtain it.
    pub was_vanity: bool,
}

/// A user's owned-games library.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OwnedLibrary {
    pub game_count: u32,
    pub games: Vec<OwnedGame>,
}

/// One ownership record. Only `app_id` and lifetime playtime are
/// guaranteed by upstream; everything else may be absent.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OwnedGame {
    pub app_id: u32,
    pub name: Option<String>,
    pub playtime_forever_minutes: u32,
    pub playtime_recent_minutes: Option<u32>,
    pub icon_hash: Option<String>,
}

/// First entry of the player-summaries payload, passed through verbatim.
/// The schema is upstream-owned and deliberately not modeled here.
pub type ProfileSummary = Map<String, Value>;

/// Normalized storefront detail record. Every field is defined for every
/// valid upstream payload; consumers never branch on a missing key.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GameDetail {
    pub name: String,
    pub short_description: String,
    pub developers: Vec<String>,
    pub publishers: Vec<String>,
    pub release_date: Option<String>,
    pub genres: Vec<String>,
    pub metacritic_score: Option<i64>,
    pub header_image: Option<String>,
    pub categories: Vec<String>,
}

/// One normalized review, in upstream (recent-first) order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReviewEntry {
    pub text: String,
    pub voted_up: bool,
    pub playtime_at_review_minutes: u32,
    pub created_at_epoch: i64,
    pub total_playtime_minutes: u32,
}

/// First storefront search match. No match is `Ok(None)`, not an error.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SearchHit {
    pub app_id: u32,
    pub name: String,
    /// Upstream result type, `"game"` when upstream omits it.
    pub kind: String,
}
