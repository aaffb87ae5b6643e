use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use axum_extra::extract::{CookieJar, Form};
use tracing::info;

use super::{delete_response, failure_notice, page, AppError, AppState};
use crate::forms::{genre_options, state_options, ArtistForm, SearchForm};
use crate::templates::{
    ArtistFormTemplate, ArtistTemplate, ArtistsTemplate, HomeTemplate, SearchArtistsTemplate,
};
use crate::{db, flash, services};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/artists", get(artists))
        .route("/artists/search", post(search_artists))
        .route(
            "/artists/create",
            get(create_artist_form).post(create_artist_submission),
        )
        .route("/artists/{artist_id}", get(show_artist).delete(delete_artist))
        .route(
            "/artists/{artist_id}/edit",
            get(edit_artist).post(edit_artist_submission),
        )
}

fn artist_form_page(
    flash: Option<String>,
    title: String,
    action: String,
    form: ArtistForm,
) -> ArtistFormTemplate {
    ArtistFormTemplate {
        flash,
        title,
        action,
        genres: genre_options(&form.genres),
        states: state_options(form.state.trim()),
        form,
    }
}

async fn artists(State(state): State<AppState>, jar: CookieJar) -> Result<Response, AppError> {
    let artists = state
        .with_store(|store, _| store.read(|tx| services::list_artists(tx)))
        .await?;
    let (jar, flash) = flash::take(jar);
    Ok((jar, page(&ArtistsTemplate { flash, artists })?).into_response())
}

async fn search_artists(
    State(state): State<AppState>,
    Form(form): Form<SearchForm>,
) -> Result<Response, AppError> {
    let term = form.search_term.clone();
    let results = state
        .with_store(move |store, now| store.read(|tx| services::search_artists(tx, &term, now)))
        .await?;
    page(&SearchArtistsTemplate {
        flash: None,
        results,
        search_term: form.search_term,
    })
}

async fn show_artist(
    State(state): State<AppState>,
    Path(artist_id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let artist = state
        .with_store(move |store, now| {
            store.read(|tx| services::artist_detail(tx, artist_id, now))
        })
        .await?;
    let (jar, flash) = flash::take(jar);
    Ok((jar, page(&ArtistTemplate { flash, artist })?).into_response())
}

async fn create_artist_form() -> Result<Response, AppError> {
    page(&artist_form_page(
        None,
        "List a new artist".to_string(),
        "/artists/create".to_string(),
        ArtistForm::default(),
    ))
}

async fn create_artist_submission(
    State(state): State<AppState>,
    Form(form): Form<ArtistForm>,
) -> Result<Response, AppError> {
    let name = form.display_name().to_string();
    let result = state
        .with_store(move |store, _| {
            store.write(|tx| {
                let fields = form.validate()?;
                db::insert_artist(tx, &fields)
            })
        })
        .await;

    let notice = match result {
        Ok(artist_id) => {
            info!(artist_id, "artist listed");
            format!("Artist {name} was successfully listed!")
        }
        Err(AppError::Store(err)) => failure_notice(
            &format!("An error occurred. Artist {name} could not be listed."),
            &err,
        ),
        Err(err) => return Err(err),
    };
    page(&HomeTemplate {
        flash: Some(notice),
    })
}

async fn delete_artist(
    State(state): State<AppState>,
    Path(artist_id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let result = state
        .with_store(move |store, _| store.write(|tx| db::delete_artist(tx, artist_id)))
        .await;
    if result.is_ok() {
        info!(artist_id, "artist deleted");
    }
    delete_response(jar, result, "Artist")
}

async fn edit_artist(
    State(state): State<AppState>,
    Path(artist_id): Path<i64>,
) -> Result<Response, AppError> {
    let artist = state
        .with_store(move |store, _| store.read(|tx| db::get_artist(tx, artist_id)))
        .await?;
    page(&artist_form_page(
        None,
        format!("Edit artist {}", artist.name),
        format!("/artists/{artist_id}/edit"),
        ArtistForm::from_artist(&artist),
    ))
}

async fn edit_artist_submission(
    State(state): State<AppState>,
    Path(artist_id): Path<i64>,
    jar: CookieJar,
    Form(form): Form<ArtistForm>,
) -> Result<Response, AppError> {
    let name = form.display_name().to_string();
    let submitted = form.clone();
    let result = state
        .with_store(move |store, _| {
            store.write(|tx| {
                db::get_artist(tx, artist_id)?;
                let fields = form.validate()?;
                db::update_artist(tx, artist_id, &fields)
            })
        })
        .await;

    match result {
        Ok(()) => {
            info!(artist_id, "artist updated");
            let jar = flash::set(jar, format!("Artist {name} was successfully updated!"));
            Ok((jar, Redirect::to(&format!("/artists/{artist_id}"))).into_response())
        }
        Err(err) if err.is_not_found() => Err(err),
        Err(AppError::Store(err)) => {
            let notice = failure_notice(
                &format!("An error occurred. Artist {name} could not be updated."),
                &err,
            );
            page(&artist_form_page(
                Some(notice),
                format!("Edit artist {name}"),
                format!("/artists/{artist_id}/edit"),
                submitted,
            ))
        }
        Err(err) => Err(err),
    }
}
