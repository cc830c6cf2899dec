//! Filtering proxy for syndication feeds.
//!
//! Fetches an RSS 2.0, Atom, or JSON feed, drops the items a filter query
//! rejects (see the [`fql`] crate for the query language), and re-emits the
//! survivors in a caller-chosen format.
//!
//! The endpoint is `GET /` with three query parameters, matched
//! case-insensitively:
//!
//! - `feed_url` - the upstream feed to fetch (required)
//! - `filter` - URL-encoded filter query; empty means "pass every item"
//! - `out` - `rss`, `atom`, `json`, or `keep` (the default): echo the input
//!   format

pub mod feed;
pub mod handler;

pub use handler::{router, AppState, BasicAuth};
