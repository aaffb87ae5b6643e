use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::Router;
use axum_extra::extract::{CookieJar, Form};
use tracing::info;

use super::{delete_response, failure_notice, page, AppError, AppState};
use crate::forms::ShowForm;
use crate::templates::{HomeTemplate, ShowFormTemplate, ShowsTemplate};
use crate::{db, flash, services};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/shows", get(shows))
        .route(
            "/shows/create",
            get(create_show_form).post(create_show_submission),
        )
        .route("/shows/{show_id}", delete(delete_show))
}

async fn shows(State(state): State<AppState>, jar: CookieJar) -> Result<Response, AppError> {
    let shows = state
        .with_store(|store, _| store.read(|tx| services::list_shows(tx)))
        .await?;
    let (jar, flash) = flash::take(jar);
    Ok((jar, page(&ShowsTemplate { flash, shows })?).into_response())
}

async fn create_show_form(State(state): State<AppState>) -> Result<Response, AppError> {
    page(&ShowFormTemplate {
        flash: None,
        form: ShowForm::starting_at(state.now()),
    })
}

async fn create_show_submission(
    State(state): State<AppState>,
    Form(form): Form<ShowForm>,
) -> Result<Response, AppError> {
    let result = state
        .with_store(move |store, _| {
            store.write(|tx| {
                let fields = form.validate()?;
                db::insert_show(tx, &fields)
            })
        })
        .await;

    let notice = match result {
        Ok(show_id) => {
            info!(show_id, "show listed");
            "Show was successfully listed!".to_string()
        }
        Err(AppError::Store(err)) => {
            failure_notice("An error occurred. Show could not be listed.", &err)
        }
        Err(err) => return Err(err),
    };
    page(&HomeTemplate {
        flash: Some(notice),
    })
}

async fn delete_show(
    State(state): State<AppState>,
    Path(show_id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let result = state
        .with_store(move |store, _| store.write(|tx| db::delete_show(tx, show_id)))
        .await;
    if result.is_ok() {
        info!(show_id, "show deleted");
    }
    delete_response(jar, result, "Show")
}
