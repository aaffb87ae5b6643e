use std::path::PathBuf;

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use fyyur_lib::db::{self, Store};
use fyyur_lib::models::{parse_timestamp, ArtistFields, ShowFields, VenueFields};
use fyyur_lib::{build_router, AppState};
use http_body_util::BodyExt;
use scraper::{Html, Selector};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

const PAST: &str = "2000-01-01 20:00:00";
const FUTURE: &str = "2099-01-01 20:00:00";

struct TestApp {
    _dir: TempDir,
    path: PathBuf,
    router: Router,
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl Reply {
    fn doc(&self) -> Html {
        Html::parse_document(&self.body)
    }

    fn text_of(&self, selector: &str) -> Vec<String> {
        let selector = Selector::parse(selector).expect("valid selector");
        self.doc()
            .select(&selector)
            .map(|node| node.text().collect::<String>().trim().to_string())
            .collect()
    }

    fn flash(&self) -> Option<String> {
        self.text_of(".flash").into_iter().next()
    }

    fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("json body")
    }
}

fn app() -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("fyyur.sqlite");
    let router = build_router(AppState::new(path.clone(), chrono_tz::UTC));
    TestApp {
        _dir: dir,
        path,
        router,
    }
}

impl TestApp {
    fn store(&self) -> Store {
        Store::open(&self.path).expect("open store")
    }

    async fn send(&self, request: Request<Body>) -> Reply {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        Reply {
            status,
            headers,
            body: String::from_utf8(bytes.to_vec()).expect("utf8 body"),
        }
    }

    async fn get(&self, uri: &str) -> Reply {
        self.send(Request::get(uri).body(Body::empty()).expect("request"))
            .await
    }

    async fn get_with_cookie(&self, uri: &str, cookie: &str) -> Reply {
        self.send(
            Request::get(uri)
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .expect("request"),
        )
        .await
    }

    async fn delete(&self, uri: &str) -> Reply {
        self.send(Request::delete(uri).body(Body::empty()).expect("request"))
            .await
    }

    async fn post_form(&self, uri: &str, pairs: &[(&str, &str)]) -> Reply {
        self.send(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form_body(pairs)))
                .expect("request"),
        )
        .await
    }
}

fn form_body(pairs: &[(&str, &str)]) -> String {
    serde_urlencoded::to_string(pairs).expect("encode form")
}

fn venue(name: &str, city: &str, state: &str) -> VenueFields {
    VenueFields {
        name: name.to_string(),
        city: city.to_string(),
        state: state.to_string(),
        address: "1 St".to_string(),
        phone: "555".to_string(),
        genres: vec!["Jazz".to_string()],
        image_link: None,
        website_link: None,
        facebook_link: None,
        seeking_talent: false,
        seeking_description: None,
    }
}

fn artist(name: &str) -> ArtistFields {
    ArtistFields {
        name: name.to_string(),
        city: "X".to_string(),
        state: "Y".to_string(),
        phone: "555".to_string(),
        genres: vec!["Jazz".to_string()],
        image_link: None,
        website_link: None,
        facebook_link: None,
        seeking_venue: false,
        seeking_description: None,
    }
}

fn show(artist_id: i64, venue_id: i64, start: &str) -> ShowFields {
    ShowFields {
        artist_id,
        venue_id,
        start_time: parse_timestamp(start).expect("timestamp"),
    }
}

const HALL_A: [(&str, &str); 7] = [
    ("name", "Hall A"),
    ("city", "X"),
    ("state", "Y"),
    ("address", "1 St"),
    ("phone", "555"),
    ("genres", "Jazz"),
    ("seeking_description", ""),
];

#[tokio::test]
async fn home_page_renders() {
    let app = app();
    let reply = app.get("/").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains("Fyyur"));
    assert_eq!(reply.flash(), None);
}

#[tokio::test]
async fn created_venue_has_no_shows() {
    let app = app();
    let reply = app.post_form("/venues/create", &HALL_A).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.flash().as_deref(),
        Some("Venue Hall A was successfully listed!")
    );

    let detail = app.get("/venues/1").await;
    assert_eq!(detail.status, StatusCode::OK);
    assert_eq!(detail.text_of("h1.name"), vec!["Hall A".to_string()]);
    assert_eq!(detail.text_of(".upcoming-count"), vec!["0".to_string()]);
    assert_eq!(detail.text_of(".past-count"), vec!["0".to_string()]);
    assert_eq!(detail.text_of(".genre"), vec!["Jazz".to_string()]);
    assert_eq!(detail.text_of(".not-seeking").len(), 1);

    let stored = app
        .store()
        .read(|tx| db::get_venue(tx, 1))
        .expect("stored venue");
    assert_eq!(stored, venue("Hall A", "X", "Y").into_venue(1));
}

#[tokio::test]
async fn invalid_venue_is_not_listed() {
    let app = app();
    let reply = app
        .post_form("/venues/create", &[("name", "Hall A"), ("genres", "Jazz")])
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    let flash = reply.flash().expect("flash message");
    assert!(flash.starts_with("An error occurred. Venue Hall A could not be listed."));
    assert!(flash.contains("city is required"));

    let listing = app.get("/venues").await;
    assert!(listing.text_of("li.venue").is_empty());
}

#[tokio::test]
async fn venues_are_grouped_by_city_and_state() {
    let app = app();
    app.store()
        .write(|tx| {
            let hop = db::insert_venue(tx, &venue("The Musical Hop", "San Francisco", "CA"))?;
            db::insert_venue(tx, &venue("The Dueling Pianos Bar", "New York", "NY"))?;
            db::insert_venue(tx, &venue("Park Square", "San Francisco", "CA"))?;
            let a = db::insert_artist(tx, &artist("Guns N Petals"))?;
            db::insert_show(tx, &show(a, hop, FUTURE))?;
            db::insert_show(tx, &show(a, hop, PAST))?;
            Ok(())
        })
        .expect("seed");

    let reply = app.get("/venues").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.text_of(".area-name"),
        vec!["San Francisco, CA".to_string(), "New York, NY".to_string()]
    );
    assert_eq!(
        reply.text_of("li.venue .name"),
        vec![
            "The Musical Hop".to_string(),
            "Park Square".to_string(),
            "The Dueling Pianos Bar".to_string(),
        ]
    );
    assert_eq!(
        reply.text_of("li.venue .upcoming-count"),
        vec!["1".to_string(), "0".to_string(), "0".to_string()]
    );
}

#[tokio::test]
async fn artist_search_matches_substrings() {
    let app = app();
    app.store()
        .write(|tx| {
            db::insert_artist(tx, &artist("Carter Quartet"))?;
            db::insert_artist(tx, &artist("Zoe"))?;
            Ok(())
        })
        .expect("seed");

    let reply = app
        .post_form("/artists/search", &[("search_term", "art")])
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.text_of(".result-count"), vec!["1".to_string()]);
    assert_eq!(
        reply.text_of("li.artist .name"),
        vec!["Carter Quartet".to_string()]
    );
}

#[tokio::test]
async fn venue_search_is_case_insensitive() {
    let app = app();
    app.store()
        .write(|tx| {
            db::insert_venue(tx, &venue("The Musical Hop", "X", "Y"))?;
            db::insert_venue(tx, &venue("Park Square Live Music & Coffee", "X", "Y"))?;
            db::insert_venue(tx, &venue("The Dueling Pianos Bar", "X", "Y"))?;
            Ok(())
        })
        .expect("seed");

    let reply = app
        .post_form("/venues/search", &[("search_term", "Music")])
        .await;
    assert_eq!(reply.text_of(".result-count"), vec!["2".to_string()]);
}

#[tokio::test]
async fn detail_pages_split_past_and_upcoming() {
    let app = app();
    let (venue_id, artist_id) = app
        .store()
        .write(|tx| {
            let v = db::insert_venue(tx, &venue("Hall A", "X", "Y"))?;
            let a = db::insert_artist(tx, &artist("Carter Quartet"))?;
            db::insert_show(tx, &show(a, v, PAST))?;
            db::insert_show(tx, &show(a, v, FUTURE))?;
            db::insert_show(tx, &show(a, v, "2098-06-01 21:00:00"))?;
            Ok((v, a))
        })
        .expect("seed");

    let artist_page = app.get(&format!("/artists/{artist_id}")).await;
    assert_eq!(artist_page.status, StatusCode::OK);
    assert_eq!(artist_page.text_of(".upcoming-count"), vec!["2".to_string()]);
    assert_eq!(artist_page.text_of(".past-count"), vec!["1".to_string()]);
    assert_eq!(
        artist_page.text_of(".upcoming-shows .start-time"),
        vec![
            "Sunday June, 1, 2098 at 9:00PM".to_string(),
            "Thursday January, 1, 2099 at 8:00PM".to_string(),
        ]
    );

    let venue_page = app.get(&format!("/venues/{venue_id}")).await;
    assert_eq!(venue_page.text_of(".upcoming-count"), vec!["2".to_string()]);
    assert_eq!(venue_page.text_of(".past-count"), vec!["1".to_string()]);
    assert_eq!(
        venue_page.text_of(".past-shows h5"),
        vec!["Carter Quartet".to_string()]
    );
}

#[tokio::test]
async fn missing_entities_are_404() {
    let app = app();
    for uri in ["/venues/7", "/artists/7", "/venues/7/edit", "/artists/7/edit", "/nowhere"] {
        let reply = app.get(uri).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(reply.text_of(".error-code"), vec!["404".to_string()]);
    }
    let reply = app.post_form("/venues/7/edit", &HALL_A).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_a_venue_removes_its_shows() {
    let app = app();
    let (venue_id, show_id) = app
        .store()
        .write(|tx| {
            let v = db::insert_venue(tx, &venue("Hall A", "X", "Y"))?;
            let a = db::insert_artist(tx, &artist("Zoe"))?;
            let s = db::insert_show(tx, &show(a, v, FUTURE))?;
            Ok((v, s))
        })
        .expect("seed");

    let reply = app.delete(&format!("/venues/{venue_id}")).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["success"], Value::Bool(true));

    let err = app
        .store()
        .read(|tx| db::get_show(tx, show_id))
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(app.get(&format!("/venues/{venue_id}")).await.status, StatusCode::NOT_FOUND);
    assert!(app.get("/shows").await.text_of("div.show").is_empty());

    let again = app.delete(&format!("/venues/{venue_id}")).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
    assert_eq!(again.json()["success"], Value::Bool(false));
}

#[tokio::test]
async fn deleting_an_artist_removes_its_shows() {
    let app = app();
    let (artist_id, show_id) = app
        .store()
        .write(|tx| {
            let v = db::insert_venue(tx, &venue("Hall A", "X", "Y"))?;
            let a = db::insert_artist(tx, &artist("Zoe"))?;
            let s = db::insert_show(tx, &show(a, v, PAST))?;
            Ok((a, s))
        })
        .expect("seed");

    let reply = app.delete(&format!("/artists/{artist_id}")).await;
    assert_eq!(reply.json()["success"], Value::Bool(true));
    assert!(app
        .store()
        .read(|tx| db::get_show(tx, show_id))
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn editing_a_venue_redirects_with_notice() {
    let app = app();
    app.post_form("/venues/create", &HALL_A).await;

    let form = app.get("/venues/1/edit").await;
    assert_eq!(form.status, StatusCode::OK);
    let doc = form.doc();
    let name_input = Selector::parse("input[name=name]").expect("selector");
    assert_eq!(
        doc.select(&name_input)
            .next()
            .and_then(|input| input.value().attr("value")),
        Some("Hall A")
    );

    let mut edited: Vec<(&str, &str)> = HALL_A
        .iter()
        .map(|(k, v)| if *k == "name" { (*k, "Hall B") } else { (*k, *v) })
        .collect();
    edited.push(("genres", "Blues"));
    edited.push(("seeking_talent", "y"));
    let reply = app.post_form("/venues/1/edit", &edited).await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(
        reply.headers.get(header::LOCATION).and_then(|v| v.to_str().ok()),
        Some("/venues/1")
    );
    let cookie = reply
        .headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .expect("flash cookie")
        .to_string();
    assert!(cookie.starts_with("flash="));

    let detail = app.get_with_cookie("/venues/1", &cookie).await;
    assert_eq!(
        detail.flash().as_deref(),
        Some("Venue Hall B was successfully updated!")
    );
    assert_eq!(
        detail.text_of(".genre"),
        vec!["Jazz".to_string(), "Blues".to_string()]
    );
    assert_eq!(detail.text_of(".seeking").len(), 1);
}

#[tokio::test]
async fn failed_edit_keeps_the_stored_record() {
    let app = app();
    app.post_form("/venues/create", &HALL_A).await;
    let before = app
        .store()
        .read(|tx| db::get_venue(tx, 1))
        .expect("stored venue");

    let edited: Vec<(&str, &str)> = HALL_A
        .iter()
        .map(|(k, v)| if *k == "phone" { (*k, "call me") } else { (*k, *v) })
        .collect();
    let reply = app.post_form("/venues/1/edit", &edited).await;
    assert_eq!(reply.status, StatusCode::OK);
    let flash = reply.flash().expect("flash message");
    assert!(flash.starts_with("An error occurred. Venue Hall A could not be updated."));

    let after = app
        .store()
        .read(|tx| db::get_venue(tx, 1))
        .expect("stored venue");
    assert_eq!(before, after);
}

#[tokio::test]
async fn artists_can_be_created_and_edited() {
    let app = app();
    let reply = app
        .post_form(
            "/artists/create",
            &[
                ("name", "Carter Quartet"),
                ("city", "Boise"),
                ("state", "ID"),
                ("phone", "208-555-0100"),
                ("genres", "Jazz"),
                ("genres", "Soul"),
                ("seeking_venue", "y"),
                ("seeking_description", "Weekend residencies"),
            ],
        )
        .await;
    assert_eq!(
        reply.flash().as_deref(),
        Some("Artist Carter Quartet was successfully listed!")
    );

    let listing = app.get("/artists").await;
    assert_eq!(
        listing.text_of("li.artist .name"),
        vec!["Carter Quartet".to_string()]
    );

    let reply = app
        .post_form(
            "/artists/1/edit",
            &[
                ("name", "Carter Trio"),
                ("city", "Boise"),
                ("state", "ID"),
                ("phone", "208-555-0100"),
                ("genres", "Jazz"),
            ],
        )
        .await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);

    let stored = app
        .store()
        .read(|tx| db::get_artist(tx, 1))
        .expect("stored artist");
    assert_eq!(stored.name, "Carter Trio");
    assert_eq!(stored.genres, vec!["Jazz".to_string()]);
    assert!(!stored.seeking_venue);
    assert_eq!(stored.seeking_description, None);
}

#[tokio::test]
async fn shows_are_listed_with_names() {
    let app = app();
    app.store()
        .write(|tx| {
            db::insert_venue(tx, &venue("Hall A", "X", "Y"))?;
            db::insert_artist(tx, &artist("Zoe"))?;
            Ok(())
        })
        .expect("seed");

    let form = app.get("/shows/create").await;
    assert_eq!(form.status, StatusCode::OK);

    let reply = app
        .post_form(
            "/shows/create",
            &[
                ("artist_id", "1"),
                ("venue_id", "1"),
                ("start_time", "2099-01-01T20:00"),
            ],
        )
        .await;
    assert_eq!(
        reply.flash().as_deref(),
        Some("Show was successfully listed!")
    );

    let listing = app.get("/shows").await;
    assert_eq!(listing.text_of("a.artist"), vec!["Zoe".to_string()]);
    assert_eq!(listing.text_of("a.venue"), vec!["Hall A".to_string()]);
    assert_eq!(
        listing.text_of(".start-time"),
        vec!["Thu 01, 01, 2099 8:00PM".to_string()]
    );
}

#[tokio::test]
async fn show_for_missing_artist_is_rejected() {
    let app = app();
    app.store()
        .write(|tx| db::insert_venue(tx, &venue("Hall A", "X", "Y")))
        .expect("seed");

    let reply = app
        .post_form(
            "/shows/create",
            &[
                ("artist_id", "99"),
                ("venue_id", "1"),
                ("start_time", FUTURE),
            ],
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.flash().as_deref(),
        Some("An error occurred. Show could not be listed. (artist 99 does not exist)")
    );
    assert!(app.get("/shows").await.text_of("div.show").is_empty());
}

#[tokio::test]
async fn deleting_a_show_only_removes_that_show() {
    let app = app();
    let (first, second) = app
        .store()
        .write(|tx| {
            let v = db::insert_venue(tx, &venue("Hall A", "X", "Y"))?;
            let a = db::insert_artist(tx, &artist("Zoe"))?;
            let first = db::insert_show(tx, &show(a, v, PAST))?;
            let second = db::insert_show(tx, &show(a, v, FUTURE))?;
            Ok((first, second))
        })
        .expect("seed");

    let reply = app.delete(&format!("/shows/{first}")).await;
    assert_eq!(reply.json()["success"], Value::Bool(true));
    let mut store = app.store();
    assert!(store.read(|tx| db::get_show(tx, first)).unwrap_err().is_not_found());
    assert!(store.read(|tx| db::get_show(tx, second)).is_ok());
}

#[tokio::test]
async fn search_matches_accented_names() {
    let app = app();
    app.store()
        .write(|tx| {
            db::insert_artist(tx, &artist("Élodie Brass"))?;
            db::insert_artist(tx, &artist("Zoe"))?;
            Ok(())
        })
        .expect("seed");

    let reply = app
        .post_form("/artists/search", &[("search_term", "élodie")])
        .await;
    assert_eq!(reply.text_of(".result-count"), vec!["1".to_string()]);
    assert_eq!(
        reply.text_of("li.artist .name"),
        vec!["Élodie Brass".to_string()]
    );
}
