//! The filtering endpoint: fetch the upstream feed, filter its items, re-emit.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tracing::{debug, error, trace, warn};

use crate::feed::{Feed, OutputFormat};

/// Credentials the endpoint itself is protected with.
#[derive(Debug, Clone)]
pub struct BasicAuth {
    pub user: String,
    pub password: String,
}

/// Shared server state.
#[derive(Debug, Clone)]
pub struct AppState {
    auth: Option<BasicAuth>,
    client: reqwest::Client,
}

impl AppState {
    /// Creates the state; `auth: None` disables authentication.
    pub fn new(auth: Option<BasicAuth>) -> Self {
        Self {
            auth,
            client: reqwest::Client::new(),
        }
    }
}

/// Builds the router serving the filtering endpoint at `/`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(filter_feed))
        .with_state(Arc::new(state))
}

/// User agent sent to upstream feeds.
fn user_agent() -> String {
    format!(
        "feed-filter/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

/// Checks the `Authorization` header against the configured credentials.
fn authorized(headers: &HeaderMap, auth: &BasicAuth) -> bool {
    let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    let Some(encoded) = value.strip_prefix("Basic ") else {
        return false;
    };
    let Ok(decoded) = BASE64.decode(encoded) else {
        return false;
    };
    let Ok(decoded) = String::from_utf8(decoded) else {
        return false;
    };
    let Some((user, password)) = decoded.split_once(':') else {
        return false;
    };
    user == auth.user && password == auth.password
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(
            header::WWW_AUTHENTICATE,
            "Basic realm=\"Access to feed-filter\", charset=\"UTF-8\"",
        )],
        Body::empty(),
    )
        .into_response()
}

async fn filter_feed(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Response {
    if let Some(auth) = &state.auth {
        if !authorized(&headers, auth) {
            return unauthorized();
        }
    }

    // Parameter names are matched case-insensitively; the first occurrence
    // of each wins.
    let mut feed_url = String::new();
    let mut filter = String::new();
    let mut output = String::new();
    for (key, value) in &params {
        match key.to_lowercase().as_str() {
            "feed_url" if feed_url.is_empty() => feed_url = value.clone(),
            "filter" if filter.is_empty() => filter = value.clone(),
            "out" if output.is_empty() => output = value.to_lowercase(),
            _ => {}
        }
    }
    trace!(feed_url = %feed_url, filter = %filter, output = %output, "serve http");

    if feed_url.is_empty() {
        error!("no feed provided");
        return (StatusCode::BAD_REQUEST, "no feed url").into_response();
    }

    let requested_format = OutputFormat::from_param(&output);

    // An empty filter means "pass every item"; any other parse failure is the
    // caller's mistake.
    let predicate = match fql::parse(&filter) {
        Ok(predicate) => Some(predicate),
        Err(fql::ParseError::EmptyQuery) => None,
        Err(e) => {
            error!(error = %e, "parsing filter failed");
            return (StatusCode::BAD_REQUEST, format!("can't parse filter: {e}")).into_response();
        }
    };

    let mut request = state
        .client
        .get(&feed_url)
        .header(header::USER_AGENT, user_agent());

    // Credentials for the upstream feed travel in dedicated headers.
    let forward_user = forwarded_header(&headers, "x-forward-user");
    let forward_password = forwarded_header(&headers, "x-forward-password");
    if !forward_user.is_empty() || !forward_password.is_empty() {
        request = request.basic_auth(forward_user, Some(forward_password));
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "fetching of feed failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let status = response.status();
    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => {
            error!(error = %e, "reading of feed body failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if !status.is_success() {
        error!(status_code = status.as_u16(), "upstream http error");
        let status =
            StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, body.to_vec()).into_response();
    }

    let parsed = match feed_rs::parser::parse(&body[..]) {
        Ok(parsed) => parsed,
        Err(e) => {
            error!(error = %e, "parsing of feed failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("can't parse feed: {feed_url}"),
            )
                .into_response();
        }
    };

    let feed = Feed::from_parsed(parsed);
    let format = requested_format.unwrap_or(feed.native_format);
    let original_items = feed.items.len();

    let feed = match &predicate {
        Some(predicate) if !predicate.is_empty() => feed.retain_matching(predicate),
        _ => feed,
    };

    let body = match feed.render(format) {
        Ok(body) => body,
        Err(e) => {
            error!(error = %e, "creating of feed failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "can't create feed").into_response();
        }
    };
    debug!(
        format = %format,
        original_items,
        kept_items = feed.items.len(),
        "feed filtered"
    );

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, format.content_type())],
        body,
    )
        .into_response()
}

fn forwarded_header(headers: &HeaderMap, name: &str) -> String {
    match headers.get(name).map(|v| v.to_str()) {
        Some(Ok(value)) => value.to_string(),
        Some(Err(_)) => {
            warn!(header = name, "ignoring non-ascii forward header");
            String::new()
        }
        None => String::new(),
    }
}
