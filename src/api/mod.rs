//! Purpose: Define the stable public API boundary for steamgate.
//! Exports: The gateway client, its value types, and the error currency.
//! Role: Public, additive-only surface; internal modules stay private.
//! Invariants: This module is the only public path to the upstream services.

mod client;
mod models;

pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::throttle::Throttle;
pub use client::{ApiResult, SteamClient};
pub use models::{
    DEFAULT_REVIEW_COUNT, GameDetail, OwnedGame, OwnedLibrary, ProfileSummary, Resolution,
    ReviewEntry, SearchHit,
};
