use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use axum_extra::extract::{CookieJar, Form};
use tracing::info;

use super::{delete_response, failure_notice, page, AppError, AppState};
use crate::forms::{genre_options, state_options, SearchForm, VenueForm};
use crate::templates::{
    HomeTemplate, SearchVenuesTemplate, VenueFormTemplate, VenueTemplate, VenuesTemplate,
};
use crate::{db, flash, services};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/venues", get(venues))
        .route("/venues/search", post(search_venues))
        .route(
            "/venues/create",
            get(create_venue_form).post(create_venue_submission),
        )
        .route("/venues/{venue_id}", get(show_venue).delete(delete_venue))
        .route(
            "/venues/{venue_id}/edit",
            get(edit_venue).post(edit_venue_submission),
        )
}

fn venue_form_page(
    flash: Option<String>,
    title: String,
    action: String,
    form: VenueForm,
) -> VenueFormTemplate {
    VenueFormTemplate {
        flash,
        title,
        action,
        genres: genre_options(&form.genres),
        states: state_options(form.state.trim()),
        form,
    }
}

async fn venues(State(state): State<AppState>, jar: CookieJar) -> Result<Response, AppError> {
    let areas = state
        .with_store(|store, now| store.read(|tx| services::list_venues_by_area(tx, now)))
        .await?;
    let (jar, flash) = flash::take(jar);
    Ok((jar, page(&VenuesTemplate { flash, areas })?).into_response())
}

async fn search_venues(
    State(state): State<AppState>,
    Form(form): Form<SearchForm>,
) -> Result<Response, AppError> {
    let term = form.search_term.clone();
    let results = state
        .with_store(move |store, now| store.read(|tx| services::search_venues(tx, &term, now)))
        .await?;
    page(&SearchVenuesTemplate {
        flash: None,
        results,
        search_term: form.search_term,
    })
}

async fn show_venue(
    State(state): State<AppState>,
    Path(venue_id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let venue = state
        .with_store(move |store, now| store.read(|tx| services::venue_detail(tx, venue_id, now)))
        .await?;
    let (jar, flash) = flash::take(jar);
    Ok((jar, page(&VenueTemplate { flash, venue })?).into_response())
}

async fn create_venue_form() -> Result<Response, AppError> {
    page(&venue_form_page(
        None,
        "List a new venue".to_string(),
        "/venues/create".to_string(),
        VenueForm::default(),
    ))
}

async fn create_venue_submission(
    State(state): State<AppState>,
    Form(form): Form<VenueForm>,
) -> Result<Response, AppError> {
    let name = form.display_name().to_string();
    let result = state
        .with_store(move |store, _| {
            store.write(|tx| {
                let fields = form.validate()?;
                db::insert_venue(tx, &fields)
            })
        })
        .await;

    let notice = match result {
        Ok(venue_id) => {
            info!(venue_id, "venue listed");
            format!("Venue {name} was successfully listed!")
        }
        Err(AppError::Store(err)) => failure_notice(
            &format!("An error occurred. Venue {name} could not be listed."),
            &err,
        ),
        Err(err) => return Err(err),
    };
    page(&HomeTemplate {
        flash: Some(notice),
    })
}

async fn delete_venue(
    State(state): State<AppState>,
    Path(venue_id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let result = state
        .with_store(move |store, _| store.write(|tx| db::delete_venue(tx, venue_id)))
        .await;
    if result.is_ok() {
        info!(venue_id, "venue deleted");
    }
    delete_response(jar, result, "Venue")
}

async fn edit_venue(
    State(state): State<AppState>,
    Path(venue_id): Path<i64>,
) -> Result<Response, AppError> {
    let venue = state
        .with_store(move |store, _| store.read(|tx| db::get_venue(tx, venue_id)))
        .await?;
    page(&venue_form_page(
        None,
        format!("Edit venue {}", venue.name),
        format!("/venues/{venue_id}/edit"),
        VenueForm::from_venue(&venue),
    ))
}

async fn edit_venue_submission(
    State(state): State<AppState>,
    Path(venue_id): Path<i64>,
    jar: CookieJar,
    Form(form): Form<VenueForm>,
) -> Result<Response, AppError> {
    let name = form.display_name().to_string();
    let submitted = form.clone();
    let result = state
        .with_store(move |store, _| {
            store.write(|tx| {
                db::get_venue(tx, venue_id)?;
                let fields = form.validate()?;
                db::update_venue(tx, venue_id, &fields)
            })
        })
        .await;

    match result {
        Ok(()) => {
            info!(venue_id, "venue updated");
            let jar = flash::set(jar, format!("Venue {name} was successfully updated!"));
            Ok((jar, Redirect::to(&format!("/venues/{venue_id}"))).into_response())
        }
        Err(err) if err.is_not_found() => Err(err),
        Err(AppError::Store(err)) => {
            let notice = failure_notice(
                &format!("An error occurred. Venue {name} could not be updated."),
                &err,
            );
            page(&venue_form_page(
                Some(notice),
                format!("Edit venue {name}"),
                format!("/venues/{venue_id}/edit"),
                submitted,
            ))
        }
        Err(err) => Err(err),
    }
}
