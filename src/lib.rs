//! Purpose: Rate-limited blocking client for the Steam Web and Storefront APIs.
//! Exports: `api` (public client surface), `core` (errors, throttling).
//! Role: Library crate consumed by agent/analysis/CLI layers; holds no ambient state.
//! Invariants: Every outbound call is serialized through one per-client throttle.
//! Invariants: Credentials are constructor inputs; nothing reads the environment.
pub mod api;
pub mod core;
