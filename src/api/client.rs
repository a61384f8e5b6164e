//! Purpose: Rate-limited gateway client for the Steam Web and Storefront APIs.
//! Exports: `SteamClient`, `ApiResult`.
//! Role: The only path to the upstream services; every operation goes through one throttle.
//! Invariants: Each operation issues at most one GET and surfaces failure synchronously.
//! Invariants: Non-200 statuses map to `Transport` uniformly; semantic kinds need a 200 body.
//! Invariants: Normalization is total; defaults substitute for any field upstream omits.
#![allow(clippy::result_large_err)]

use super::{
    GameDetail, OwnedGame, OwnedLibrary, ProfileSummary, Resolution, ReviewEntry, SearchHit,
};
use crate::core::error::{Error, ErrorKind};
use crate::core::throttle::Throttle;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub type ApiResult<T> = Result<T, Error>;

const WEB_BASE_URL: &str = "https://api.steampowered.com";
const STORE_BASE_URL: &str = "https://store.steampowered.com";

const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const STEAM_ID_DIGITS: usize = 17;
const REVIEW_DAY_RANGE: &str = "30";
// Storefront page-size ceiling; one page always covers a practical request.
const REVIEW_PAGE_SIZE: &str = "100";

// The review endpoint rejects non-browser traffic, so requests carry a
// fixed browser profile.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

#[derive(Clone, Debug)]
pub struct SteamClient {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    api_key: String,
    web_base_url: Url,
    store_base_url: Url,
    agent: ureq::Agent,
    throttle: Throttle,
}

#[derive(Deserialize)]
struct VanityEnvelope {
    #[serde(default)]
    response: VanityResponse,
}

#[derive(Deserialize, Default)]
struct VanityResponse {
    #[serde(default)]
    success: i64,
    #[serde(default)]
    steamid: Option<String>,
}

#[derive(Deserialize)]
struct OwnedGamesEnvelope {
    #[serde(default)]
    response: OwnedGamesResponse,
}

#[derive(Deserialize, Default)]
struct OwnedGamesResponse {
    #[serde(default)]
    game_count: u32,
    #[serde(default)]
    games: Option<Vec<RawOwnedGame>>,
}

#[derive(Deserialize)]
struct RawOwnedGame {
    appid: u32,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    playtime_forever: u32,
    #[serde(default)]
    playtime_2weeks: Option<u32>,
    #[serde(default)]
    img_icon_url: Option<String>,
}

#[derive(Deserialize)]
struct SummariesEnvelope {
    #[serde(default)]
    response: SummariesResponse,
}

#[derive(Deserialize, Default)]
struct SummariesResponse {
    #[serde(default)]
    players: Vec<Map<String, Value>>,
}

#[derive(Deserialize)]
struct DetailEntry {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Deserialize)]
struct ReviewsEnvelope {
    #[serde(default)]
    success: Value,
    #[serde(default)]
    reviews: Vec<Value>,
}

#[derive(Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    id: u32,
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default = "default_search_kind")]
    kind: String,
}

fn default_search_kind() -> String {
    "game".to_string()
}

impl SteamClient {
    pub fn new(api_key: impl Into<String>) -> ApiResult<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::new(ErrorKind::Config).with_message("steam api key is missing"));
        }
        let web_base_url = normalize_base_url(WEB_BASE_URL.to_string())?;
        let store_base_url = normalize_base_url(STORE_BASE_URL.to_string())?;
        let agent = build_agent(DEFAULT_TIMEOUT);
        Ok(Self {
            inner: Arc::new(ClientInner {
                api_key,
                web_base_url,
                store_base_url,
                agent,
                throttle: Throttle::new(DEFAULT_MIN_INTERVAL),
            }),
        })
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.throttle = Throttle::new(min_interval);
        } else {
            self.inner = Arc::new(ClientInner {
                api_key: self.inner.api_key.clone(),
                web_base_url: self.inner.web_base_url.clone(),
                store_base_url: self.inner.store_base_url.clone(),
                agent: self.inner.agent.clone(),
                throttle: Throttle::new(min_interval),
            });
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let agent = build_agent(timeout);
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.agent = agent;
        } else {
            self.inner = Arc::new(ClientInner {
                api_key: self.inner.api_key.clone(),
                web_base_url: self.inner.web_base_url.clone(),
                store_base_url: self.inner.store_base_url.clone(),
                agent,
                throttle: Throttle::new(self.inner.throttle.min_interval()),
            });
        }
        self
    }

    pub fn with_web_base_url(mut self, base_url: impl Into<String>) -> ApiResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.web_base_url = base_url;
        } else {
            self.inner = Arc::new(ClientInner {
                api_key: self.inner.api_key.clone(),
                web_base_url: base_url,
                store_base_url: self.inner.store_base_url.clone(),
                agent: self.inner.agent.clone(),
                throttle: Throttle::new(self.inner.throttle.min_interval()),
            });
        }
        Ok(self)
    }

    pub fn with_store_base_url(mut self, base_url: impl Into<String>) -> ApiResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.store_base_url = base_url;
        } else {
            self.inner = Arc::new(ClientInner {
                api_key: self.inner.api_key.clone(),
                web_base_url: self.inner.web_base_url.clone(),
                store_base_url: base_url,
                agent: self.inner.agent.clone(),
                throttle: Throttle::new(self.inner.throttle.min_interval()),
            });
        }
        Ok(self)
    }

    pub fn web_base_url(&self) -> &Url {
        &self.inner.web_base_url
    }

    pub fn store_base_url(&self) -> &Url {
        &self.inner.store_base_url
    }

    /// Resolves a raw SteamID64 or vanity name to a canonical identity.
    /// Canonical input is accepted locally without spending a throttle slot.
    pub fn resolve_identity(&self, id_or_vanity: &str) -> ApiResult<Resolution> {
        if id_or_vanity.is_empty() {
            return Err(
                Error::new(ErrorKind::InvalidIdentity).with_message("identity must not be empty")
            );
        }
        if is_canonical_steam_id(id_or_vanity) {
            return Ok(Resolution {
                steam_id: id_or_vanity.to_string(),
                was_vanity: false,
            });
        }

        let mut url = build_url(
            &self.inner.web_base_url,
            &["ISteamUser", "ResolveVanityURL", "v1", ""],
        )?;
        url.query_pairs_mut()
            .append_pair("key", &self.inner.api_key)
            .append_pair("vanityurl", id_or_vanity);

        let envelope: VanityEnvelope = self.get_json(&url, &[])?;
        if envelope.response.success != 1 {
            return Err(Error::new(ErrorKind::InvalidIdentity)
                .with_message("vanity name did not resolve"));
        }
        match envelope.response.steamid {
            Some(steam_id) => Ok(Resolution {
                steam_id,
                was_vanity: true,
            }),
            None => Err(Error::new(ErrorKind::Internal)
                .with_message("resolution response missing steamid")),
        }
    }

    /// Fetches the owned-games library, enriched with app metadata and
    /// including played free titles. A payload without a games field means
    /// the profile or its game details are private.
    pub fn owned_games(&self, steam_id: &str) -> ApiResult<OwnedLibrary> {
        let mut url = build_url(
            &self.inner.web_base_url,
            &["IPlayerService", "GetOwnedGames", "v1", ""],
        )?;
        url.query_pairs_mut()
            .append_pair("key", &self.inner.api_key)
            .append_pair("steamid", steam_id)
            .append_pair("include_appinfo", "1")
            .append_pair("include_played_free_games", "1");

        let envelope: OwnedGamesEnvelope = self.get_json(&url, &[])?;
        let Some(games) = envelope.response.games else {
            return Err(Error::new(ErrorKind::PrivateLibrary)
                .with_message("profile or game details are private"));
        };
        Ok(OwnedLibrary {
            game_count: envelope.response.game_count,
            games: games.into_iter().map(owned_game_from_raw).collect(),
        })
    }

    /// Fetches the profile summary and returns the first entry verbatim.
    pub fn player_summary(&self, steam_id: &str) -> ApiResult<ProfileSummary> {
        let mut url = build_url(
            &self.inner.web_base_url,
            &["ISteamUser", "GetPlayerSummaries", "v2", ""],
        )?;
        url.query_pairs_mut()
            .append_pair("key", &self.inner.api_key)
            .append_pair("steamids", steam_id);

        let envelope: SummariesEnvelope = self.get_json(&url, &[])?;
        envelope
            .response
            .players
            .into_iter()
            .next()
            .ok_or_else(|| Error::new(ErrorKind::ProfileNotFound).with_message("player not found"))
    }

    /// Fetches and normalizes the storefront detail record for any catalog
    /// app, owned or not. Region and language are pinned for deterministic
    /// text.
    pub fn game_detail(&self, app_id: u32) -> ApiResult<GameDetail> {
        let mut url = build_url(&self.inner.store_base_url, &["api", "appdetails"])?;
        url.query_pairs_mut()
            .append_pair("appids", &app_id.to_string())
            .append_pair("cc", "us")
            .append_pair("l", "english");

        let body: HashMap<String, DetailEntry> = self.get_json(&url, &[])?;
        let entry = body
            .get(&app_id.to_string())
            .filter(|entry| entry.success)
            .ok_or_else(|| {
                Error::new(ErrorKind::GameDetailsUnavailable)
                    .with_message("game details not available")
            })?;
        let data = entry.data.as_ref().ok_or_else(|| {
            Error::new(ErrorKind::GameDetailsUnavailable).with_message("game details not available")
        })?;
        Ok(normalize_game_detail(data))
    }

    /// Fetches up to `count` recent reviews. Upstream is always asked for a
    /// full page and the result is truncated locally, so one call suffices
    /// for any practical count.
    pub fn game_reviews(&self, app_id: u32, count: usize) -> ApiResult<Vec<ReviewEntry>> {
        let mut url = build_url(
            &self.inner.store_base_url,
            &["appreviews", &app_id.to_string()],
        )?;
        url.query_pairs_mut()
            .append_pair("json", "1")
            .append_pair("filter", "recent")
            .append_pair("language", "english")
            .append_pair("day_range", REVIEW_DAY_RANGE)
            .append_pair("num_per_page", REVIEW_PAGE_SIZE)
            .append_pair("purchase_type", "all")
            .append_pair("cursor", "*")
            .append_pair("review_type", "all");
        let referer = format!("https://store.steampowered.com/app/{app_id}");
        let headers = [
            ("User-Agent", BROWSER_USER_AGENT),
            ("Accept-Language", "en-US,en;q=0.9"),
            ("Referer", referer.as_str()),
        ];

        let envelope: ReviewsEnvelope = self.get_json(&url, &headers)?;
        if !flag_is_truthy(&envelope.success) {
            return Err(
                Error::new(ErrorKind::ReviewsUnavailable).with_message("reviews not available")
            );
        }
        let mut entries: Vec<ReviewEntry> = envelope.reviews.iter().map(normalize_review).collect();
        entries.truncate(count);
        Ok(entries)
    }

    /// Searches the storefront by name. No match is an expected outcome,
    /// not an error.
    pub fn search(&self, term: &str) -> ApiResult<Option<SearchHit>> {
        let mut url = build_url(&self.inner.store_base_url, &["api", "storesearch"])?;
        url.query_pairs_mut()
            .append_pair("term", term)
            .append_pair("l", "english")
            .append_pair("cc", "us");

        let envelope: SearchEnvelope = self.get_json(&url, &[])?;
        if envelope.total == 0 {
            return Ok(None);
        }
        Ok(envelope.items.into_iter().next().map(|item| SearchHit {
            app_id: item.id,
            name: item.name,
            kind: item.kind,
        }))
    }

    fn get_json<R>(&self, url: &Url, headers: &[(&str, &str)]) -> ApiResult<R>
    where
        R: DeserializeOwned,
    {
        self.inner.throttle.acquire();
        // Query strings carry the credential; log the path only.
        tracing::debug!(path = url.path(), "issuing steam request");

        let mut request = self
            .inner
            .agent
            .request("GET", url.as_str())
            .set("Accept", "application/json");
        for (name, value) in headers {
            request = request.set(name, value);
        }

        match request.call() {
            Ok(response) => read_json_response(response),
            Err(ureq::Error::Status(code, _response)) => Err(Error::new(ErrorKind::Transport)
                .with_message("steam returned non-success status")
                .with_status(code)),
            Err(ureq::Error::Transport(err)) => Err(Error::new(ErrorKind::Transport)
                .with_message("request failed")
                .with_source(err)),
        }
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(timeout).build()
}

fn is_canonical_steam_id(input: &str) -> bool {
    input.len() == STEAM_ID_DIGITS && input.bytes().all(|byte| byte.is_ascii_digit())
}

fn normalize_base_url(raw: String) -> ApiResult<Url> {
    let mut url = Url::parse(&raw).map_err(|err| {
        Error::new(ErrorKind::Config)
            .with_message("invalid base url")
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(Error::new(ErrorKind::Config).with_message("base url must use http or https"));
    }
    if url.path() != "/" && !url.path().is_empty() {
        return Err(Error::new(ErrorKind::Config).with_message("base url must not include a path"));
    }
    url.set_path("/");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn build_url(base_url: &Url, segments: &[&str]) -> ApiResult<Url> {
    let mut url = base_url.clone();
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| Error::new(ErrorKind::Config).with_message("base url cannot be a base"))?;
        path.clear();
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url)
}

fn owned_game_from_raw(raw: RawOwnedGame) -> OwnedGame {
    OwnedGame {
        app_id: raw.appid,
        name: raw.name,
        playtime_forever_minutes: raw.playtime_forever,
        playtime_recent_minutes: raw.playtime_2weeks,
        icon_hash: raw.img_icon_url,
    }
}

fn normalize_game_detail(data: &Value) -> GameDetail {
    GameDetail {
        name: string_or(data.get("name"), "Unknown"),
        short_description: string_or(data.get("short_description"), "No description available"),
        developers: string_seq(data.get("developers")),
        publishers: string_seq(data.get("publishers")),
        release_date: data
            .get("release_date")
            .and_then(|release| release.get("date"))
            .and_then(Value::as_str)
            .map(str::to_string),
        genres: described_seq(data.get("genres")),
        metacritic_score: data
            .get("metacritic")
            .and_then(|metacritic| metacritic.get("score"))
            .and_then(Value::as_i64),
        header_image: data
            .get("header_image")
            .and_then(Value::as_str)
            .map(str::to_string),
        categories: described_seq(data.get("categories")),
    }
}

fn normalize_review(raw: &Value) -> ReviewEntry {
    let author = raw.get("author");
    ReviewEntry {
        text: string_or(raw.get("review"), ""),
        voted_up: raw
            .get("voted_up")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        playtime_at_review_minutes: minutes(
            author.and_then(|author| author.get("playtime_at_review")),
        ),
        created_at_epoch: raw
            .get("timestamp_created")
            .and_then(Value::as_i64)
            .unwrap_or(0),
        total_playtime_minutes: minutes(author.and_then(|author| author.get("playtime_forever"))),
    }
}

// The storefront signals success as 1, but has been seen using booleans.
fn flag_is_truthy(flag: &Value) -> bool {
    match flag {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map(|n| n != 0.0).unwrap_or(false),
        _ => false,
    }
}

fn string_or(value: Option<&Value>, fallback: &str) -> String {
    value
        .and_then(Value::as_str)
        .unwrap_or(fallback)
        .to_string()
}

fn string_seq(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

// Genre and category objects carry their display text under "description".
fn described_seq(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("description"))
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn minutes(value: Option<&Value>) -> u32 {
    value
        .and_then(Value::as_u64)
        .map(|minutes| minutes.min(u64::from(u32::MAX)) as u32)
        .unwrap_or(0)
}

fn read_json_response<R>(response: ureq::Response) -> ApiResult<R>
where
    R: DeserializeOwned,
{
    let body = response.into_string().map_err(|err| {
        Error::new(ErrorKind::Transport)
            .with_message("failed to read response body")
            .with_source(err)
    })?;
    serde_json::from_str(&body).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("invalid response json")
            .with_source(err)
    })
}

#[cfg(test)]
mod tests {
    use super::{
        SteamClient, build_url, flag_is_truthy, is_canonical_steam_id, normalize_base_url,
        normalize_game_detail, normalize_review,
    };
    use crate::core::error::ErrorKind;
    use serde_json::{Value, json};

    #[test]
    fn canonical_id_is_17_digits() {
        assert!(is_canonical_steam_id("76561197960435530"));
        assert!(!is_canonical_steam_id("7656119796043553"));
        assert!(!is_canonical_steam_id("765611979604355301"));
        assert!(!is_canonical_steam_id("7656119796043553x"));
        assert!(!is_canonical_steam_id("gabelogannewell"));
        assert!(!is_canonical_steam_id(""));
    }

    #[test]
    fn new_rejects_empty_api_key() {
        let err = SteamClient::new("").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn normalize_base_url_strips_query_and_trailing_slash() {
        let url = normalize_base_url("http://127.0.0.1:8080?x=1".to_string()).expect("url");
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/");
    }

    #[test]
    fn normalize_base_url_rejects_path() {
        let err = normalize_base_url("https://store.steampowered.com/api".to_string())
            .expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn normalize_base_url_rejects_other_schemes() {
        let err = normalize_base_url("ftp://store.steampowered.com".to_string()).expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn build_url_keeps_trailing_slash_segment() {
        let base = normalize_base_url("https://api.steampowered.com".to_string()).expect("url");
        let url = build_url(&base, &["ISteamUser", "ResolveVanityURL", "v1", ""]).expect("url");
        assert_eq!(
            url.as_str(),
            "https://api.steampowered.com/ISteamUser/ResolveVanityURL/v1/"
        );
    }

    #[test]
    fn game_detail_defaults_cover_empty_payload() {
        let detail = normalize_game_detail(&json!({}));
        assert_eq!(detail.name, "Unknown");
        assert_eq!(detail.short_description, "No description available");
        assert!(detail.developers.is_empty());
        assert!(detail.publishers.is_empty());
        assert_eq!(detail.release_date, None);
        assert!(detail.genres.is_empty());
        assert_eq!(detail.metacritic_score, None);
        assert_eq!(detail.header_image, None);
        assert!(detail.categories.is_empty());
    }

    #[test]
    fn game_detail_projects_descriptions_and_nested_score() {
        let detail = normalize_game_detail(&json!({
            "name": "Half-Life 2",
            "release_date": {"coming_soon": false, "date": "16 Nov, 2004"},
            "genres": [{"id": "1", "description": "Action"}, {"id": "37", "description": "FPS"}],
            "categories": [{"id": 2, "description": "Single-player"}],
            "metacritic": {"score": 96, "url": "https://www.metacritic.com/game/half-life-2"},
        }));
        assert_eq!(detail.name, "Half-Life 2");
        assert_eq!(detail.release_date.as_deref(), Some("16 Nov, 2004"));
        assert_eq!(detail.genres, vec!["Action", "FPS"]);
        assert_eq!(detail.categories, vec!["Single-player"]);
        assert_eq!(detail.metacritic_score, Some(96));
    }

    #[test]
    fn game_detail_skips_malformed_seq_entries() {
        let detail = normalize_game_detail(&json!({
            "developers": ["Valve", 7, null],
            "genres": [{"description": "Action"}, {"id": "9"}, "loose"],
        }));
        assert_eq!(detail.developers, vec!["Valve"]);
        assert_eq!(detail.genres, vec!["Action"]);
    }

    #[test]
    fn review_defaults_cover_empty_payload() {
        let entry = normalize_review(&json!({}));
        assert_eq!(entry.text, "");
        assert!(!entry.voted_up);
        assert_eq!(entry.playtime_at_review_minutes, 0);
        assert_eq!(entry.created_at_epoch, 0);
        assert_eq!(entry.total_playtime_minutes, 0);
    }

    #[test]
    fn review_projects_author_playtimes() {
        let entry = normalize_review(&json!({
            "review": "Good crowbar.",
            "voted_up": true,
            "timestamp_created": 1700000000,
            "author": {"playtime_at_review": 120, "playtime_forever": 840},
        }));
        assert_eq!(entry.text, "Good crowbar.");
        assert!(entry.voted_up);
        assert_eq!(entry.playtime_at_review_minutes, 120);
        assert_eq!(entry.created_at_epoch, 1700000000);
        assert_eq!(entry.total_playtime_minutes, 840);
    }

    #[test]
    fn success_flag_truthiness() {
        assert!(flag_is_truthy(&json!(1)));
        assert!(flag_is_truthy(&json!(true)));
        assert!(!flag_is_truthy(&json!(0)));
        assert!(!flag_is_truthy(&json!(false)));
        assert!(!flag_is_truthy(&Value::Null));
        assert!(!flag_is_truthy(&json!("1")));
    }
}
