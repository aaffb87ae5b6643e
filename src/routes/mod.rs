mod artists;
mod shows;
mod venues;

use std::path::PathBuf;

use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::extract::CookieJar;
use chrono::{NaiveDateTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::db::Store;
use crate::error::{StoreError, StoreResult};
use crate::flash;
use crate::templates::{HomeTemplate, NotFoundTemplate, ServerErrorTemplate};

#[derive(Clone, Debug)]
pub struct AppState {
    pub database_path: PathBuf,
    pub timezone: Tz,
}

impl AppState {
    pub fn new(database_path: PathBuf, timezone: Tz) -> Self {
        Self {
            database_path,
            timezone,
        }
    }

    /// Wall-clock time in the configured zone, truncated to whole seconds to
    /// match stored start times.
    pub fn now(&self) -> NaiveDateTime {
        let now = Utc::now().with_timezone(&self.timezone).naive_local();
        now.with_nanosecond(0).unwrap_or(now)
    }

    /// Opens a connection for this request on the blocking pool and runs `op`
    /// against it. The connection, and any uncommitted transaction, is released
    /// when `op` returns.
    pub async fn with_store<T, F>(&self, op: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Store, NaiveDateTime) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.database_path.clone();
        let now = self.now();
        let result = tokio::task::spawn_blocking(move || -> StoreResult<T> {
            let mut store = Store::open(&path)?;
            op(&mut store, now)
        })
        .await?;
        Ok(result?)
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("template rendering failed: {0}")]
    Render(#[from] askama::Error),
}

impl AppError {
    fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(err) if err.is_not_found())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_not_found() {
            tracing::info!(error = %self, "not found");
            return not_found_page();
        }
        error!(error = %self, "request failed");
        let body = ServerErrorTemplate { flash: None }
            .render()
            .unwrap_or_else(|_| "Internal Server Error".to_string());
        (StatusCode::INTERNAL_SERVER_ERROR, Html(body)).into_response()
    }
}

pub(crate) fn page<T: Template>(template: &T) -> Result<Response, AppError> {
    Ok(Html(template.render()?).into_response())
}

fn not_found_page() -> Response {
    let body = NotFoundTemplate { flash: None }
        .render()
        .unwrap_or_else(|_| "Not Found".to_string());
    (StatusCode::NOT_FOUND, Html(body)).into_response()
}

/// Flash text for a failed write. Constraint problems carry their reason;
/// store faults stay generic and are only logged.
pub(crate) fn failure_notice(prefix: &str, err: &StoreError) -> String {
    warn!(error = %err, "{prefix}");
    match err {
        StoreError::ConstraintViolation(reason) => format!("{prefix} ({reason})"),
        _ => prefix.to_string(),
    }
}

/// Body of the delete endpoints.
#[derive(Serialize, Debug)]
pub(crate) struct DeleteOutcome {
    pub success: bool,
}

pub(crate) fn delete_response(
    jar: CookieJar,
    result: Result<(), AppError>,
    noun: &str,
) -> Result<Response, AppError> {
    match result {
        Ok(()) => {
            let jar = flash::set(jar, format!("{noun} was successfully deleted!"));
            Ok((jar, Json(DeleteOutcome { success: true })).into_response())
        }
        Err(err) if err.is_not_found() => {
            Ok((StatusCode::NOT_FOUND, Json(DeleteOutcome { success: false })).into_response())
        }
        Err(AppError::Store(err)) => {
            let notice = failure_notice(
                &format!("An error occurred. {noun} could not be deleted."),
                &err,
            );
            let jar = flash::set(jar, notice);
            Ok((jar, Json(DeleteOutcome { success: false })).into_response())
        }
        Err(err) => Err(err),
    }
}

async fn index(jar: CookieJar) -> Result<Response, AppError> {
    let (jar, flash) = flash::take(jar);
    Ok((jar, page(&HomeTemplate { flash })?).into_response())
}

async fn fallback() -> Response {
    not_found_page()
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .merge(venues::routes())
        .merge(artists::routes())
        .merge(shows::routes())
        .fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
