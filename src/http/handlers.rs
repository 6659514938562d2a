use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Path, RawQuery, State};
use axum::response::{IntoResponse, Response};
use log::{debug, error};
use tokio::time::timeout;

use super::query::Query;
use super::{requests, responses};
use crate::protocol::common::REQUEST_TIMEOUT;
use crate::tracker::auth::Passkey;
use crate::tracker::request::Event;
use crate::tracker::swarm::User;
use crate::tracker::Tracker;

pub async fn handle_announce(
    State(tracker): State<Arc<Tracker>>,
    Path(passkey): Path<String>,
    RawQuery(raw_query): RawQuery,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
) -> Response {
    tracker.stats.accept_http();

    let query = match raw_query.as_deref().unwrap_or_default().parse::<Query>() {
        Ok(query) => query,
        Err(e) => {
            debug!("http: unparseable announce query from {}: {}", remote_addr, e);
            return error_response(&tracker, "Malformed announce");
        }
    };

    let announce = match requests::announce_from_query(&query, remote_addr.ip()) {
        Ok(announce) => announce,
        Err(e) => {
            debug!("http: bad announce from {}: {}", remote_addr, e);
            return error_response(&tracker, "Malformed announce");
        }
    };

    let user = match resolve_user(&tracker, &passkey).await {
        Ok(user) => user,
        Err(reason) => return error_response(&tracker, reason),
    };

    let event = match announce.event {
        Event::None => String::new(),
        event => format!("{event} "),
    };
    debug!(
        "announce: [http {}:{}] {}{}",
        announce.ip, announce.port, event, announce.info_hash
    );

    match timeout(REQUEST_TIMEOUT, tracker.announce(&announce, Some(&user))).await {
        Ok(Ok(data)) => responses::Announce::from(data).body().into_response(),
        Ok(Err(e)) => error_response(&tracker, &e.to_string()),
        Err(_) => error_response(&tracker, "internal error"),
    }
}

pub async fn handle_scrape(
    State(tracker): State<Arc<Tracker>>,
    Path(passkey): Path<String>,
    RawQuery(raw_query): RawQuery,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
) -> Response {
    tracker.stats.accept_http();

    let query = match raw_query.as_deref().unwrap_or_default().parse::<Query>() {
        Ok(query) => query,
        Err(e) => {
            debug!("http: unparseable scrape query from {}: {}", remote_addr, e);
            return error_response(&tracker, "Malformed scrape");
        }
    };

    let scrape = match requests::scrape_from_query(&query, remote_addr.ip()) {
        Ok(scrape) => scrape,
        Err(e) => {
            debug!("http: bad scrape from {}: {}", remote_addr, e);
            return error_response(&tracker, "Malformed scrape");
        }
    };

    if let Err(reason) = resolve_user(&tracker, &passkey).await {
        return error_response(&tracker, reason);
    }

    debug!("scrape: [http {}] {}", scrape.ip, scrape.info_hashes[0]);

    match timeout(REQUEST_TIMEOUT, tracker.scrape(&scrape)).await {
        Ok(Ok(files)) => match files.first() {
            Some(data) => responses::Scrape::from(*data).body().into_response(),
            None => error_response(&tracker, "internal error"),
        },
        Ok(Err(e)) => error_response(&tracker, &e.to_string()),
        Err(_) => error_response(&tracker, "internal error"),
    }
}

async fn resolve_user(tracker: &Tracker, raw_passkey: &str) -> Result<User, &'static str> {
    let Ok(passkey) = Passkey::from_str(raw_passkey) else {
        return Err("Passkey not found");
    };

    match tracker.database.load_user_by_passkey(&passkey).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err("Passkey not found"),
        Err(e) => {
            error!("http: user lookup failed: {}", e);
            Err("internal error")
        }
    }
}

fn error_response(tracker: &Tracker, failure_reason: &str) -> Response {
    let (interval, min_interval) = tracker.steady_interval();

    responses::Error {
        failure_reason: failure_reason.to_string(),
        interval,
        min_interval,
    }
    .body()
    .into_response()
}
