use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;

use super::resource;
use super::resource::status::Status;
use super::responses::{internal_error, invalid_id, method_not_allowed, not_found, undefined_api_call};
use crate::databases;
use crate::tracker::swarm::File;
use crate::tracker::Tracker;

pub async fn get_status(State(tracker): State<Arc<Tracker>>) -> Response {
    Json(Status::collect(&tracker)).into_response()
}

pub async fn get_files(State(tracker): State<Arc<Tracker>>) -> Response {
    let files = match tracker.database.load_files().await {
        Ok(files) => files,
        Err(e) => {
            error!("api: could not load files: {}", e);
            return internal_error();
        }
    };

    let mut resources = Vec::with_capacity(files.len());
    for file in files {
        match file_resource(&tracker, file).await {
            Ok(resource) => resources.push(resource),
            Err(e) => {
                error!("api: could not load file counts: {}", e);
                return internal_error();
            }
        }
    }

    Json(resources).into_response()
}

pub async fn get_file(State(tracker): State<Arc<Tracker>>, Path(id): Path<String>) -> Response {
    let Some(id) = parse_id(&id) else {
        return invalid_id();
    };

    match tracker.database.load_file_by_id(id).await {
        Ok(Some(file)) => match file_resource(&tracker, file).await {
            Ok(resource) => Json(resource).into_response(),
            Err(e) => {
                error!("api: could not load file counts: {}", e);
                internal_error()
            }
        },
        Ok(None) => not_found(),
        Err(e) => {
            error!("api: could not load file: {}", e);
            internal_error()
        }
    }
}

pub async fn get_users(State(tracker): State<Arc<Tracker>>) -> Response {
    match tracker.database.load_users().await {
        Ok(users) => Json(users.into_iter().map(resource::user::User::from).collect::<Vec<_>>()).into_response(),
        Err(e) => {
            error!("api: could not load users: {}", e);
            internal_error()
        }
    }
}

pub async fn get_user(State(tracker): State<Arc<Tracker>>, Path(id): Path<String>) -> Response {
    let Some(id) = parse_id(&id) else {
        return invalid_id();
    };

    match tracker.database.load_user(id).await {
        Ok(Some(user)) => Json(resource::user::User::from(user)).into_response(),
        Ok(None) => not_found(),
        Err(e) => {
            error!("api: could not load user: {}", e);
            internal_error()
        }
    }
}

/// Serves the method fallbacks: POST is a permitted method hitting a
/// read-only endpoint, anything else is not allowed at all.
pub async fn method_fallback(method: Method) -> Response {
    if method == Method::POST {
        undefined_api_call()
    } else {
        method_not_allowed()
    }
}

pub async fn unknown_api_call() -> Response {
    undefined_api_call()
}

async fn file_resource(tracker: &Tracker, file: File) -> Result<resource::file::File, databases::error::Error> {
    Ok(resource::file::File {
        id: file.id,
        info_hash: file.info_hash.to_string(),
        verified: file.verified,
        seeders: tracker.database.seeders(file.id).await?,
        leechers: tracker.database.leechers(file.id).await?,
        completed: tracker.database.completed(file.id).await?,
        created_at: file.created_at,
    })
}

fn parse_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| *id >= 1)
}

#[cfg(test)]
mod tests {
    use super::parse_id;

    #[test]
    fn ids_must_be_positive_integers() {
        assert_eq!(parse_id("1"), Some(1));
        assert_eq!(parse_id("42"), Some(42));
        assert_eq!(parse_id("0"), None);
        assert_eq!(parse_id("-1"), None);
        assert_eq!(parse_id("abc"), None);
        assert_eq!(parse_id("1.5"), None);
    }
}
