//! Read-side aggregation: turns rows into the nested view models the pages
//! render. Every function runs inside the caller's transaction and classifies
//! shows against the `now` it is given.

use chrono::NaiveDateTime;
use rusqlite::{params, Transaction};

use crate::db::{self, decode_start_time};
use crate::error::StoreResult;
use crate::models::{format_timestamp, is_upcoming};
use crate::views::{
    Area, ArtistDetail, ArtistListing, ArtistSummary, SearchResults, ShowWithArtist,
    ShowWithNames, ShowWithVenue, VenueDetail, VenueSummary,
};

fn distinct_areas(tx: &Transaction<'_>) -> StoreResult<Vec<(String, String)>> {
    let mut stmt = tx.prepare(
        "SELECT city, state FROM venues
         GROUP BY city, state
         ORDER BY MIN(id)",
    )?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn venues_in_area(
    tx: &Transaction<'_>,
    city: &str,
    state: &str,
    now: &str,
) -> StoreResult<Vec<VenueSummary>> {
    let mut stmt = tx.prepare(
        "SELECT v.id, v.name,
                (SELECT COUNT(*) FROM shows s WHERE s.venue_id = v.id AND s.start_time > ?3)
         FROM venues v
         WHERE v.city = ?1 AND v.state = ?2
         ORDER BY v.id",
    )?;
    let rows = stmt.query_map(params![city, state, now], |row| {
        Ok(VenueSummary {
            id: row.get(0)?,
            name: row.get(1)?,
            num_upcoming_shows: row.get(2)?,
        })
    })?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Venues grouped under their (city, state), areas in order of first listing.
pub fn list_venues_by_area(tx: &Transaction<'_>, now: NaiveDateTime) -> StoreResult<Vec<Area>> {
    let now = format_timestamp(&now);
    let mut areas = Vec::new();
    for (city, state) in distinct_areas(tx)? {
        let venues = venues_in_area(tx, &city, &state, &now)?;
        areas.push(Area {
            city,
            state,
            venues,
        });
    }
    Ok(areas)
}

/// Lowercased search term with surrounding whitespace removed. Lowercasing is
/// done here rather than in SQL, whose `lower()` only folds ASCII.
fn search_needle(term: &str) -> String {
    term.trim().to_lowercase()
}

fn name_matches(name: &str, needle: &str) -> bool {
    name.to_lowercase().contains(needle)
}

/// Venues whose name contains `term`, ignoring case. The term is trimmed
/// first, and a blank term matches every venue.
pub fn search_venues(
    tx: &Transaction<'_>,
    term: &str,
    now: NaiveDateTime,
) -> StoreResult<SearchResults<VenueSummary>> {
    let mut stmt = tx.prepare(
        "SELECT v.id, v.name,
                (SELECT COUNT(*) FROM shows s WHERE s.venue_id = v.id AND s.start_time > ?1)
         FROM venues v
         ORDER BY v.id",
    )?;
    let rows = stmt.query_map(params![format_timestamp(&now)], |row| {
        Ok(VenueSummary {
            id: row.get(0)?,
            name: row.get(1)?,
            num_upcoming_shows: row.get(2)?,
        })
    })?;

    let needle = search_needle(term);
    let mut data = Vec::new();
    for row in rows {
        let summary = row?;
        if name_matches(&summary.name, &needle) {
            data.push(summary);
        }
    }
    Ok(SearchResults::new(data))
}

pub fn list_artists(tx: &Transaction<'_>) -> StoreResult<Vec<ArtistListing>> {
    let mut stmt = tx.prepare("SELECT id, name FROM artists ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok(ArtistListing {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Artists whose name contains `term`, ignoring case. The term is trimmed
/// first, and a blank term matches every artist.
pub fn search_artists(
    tx: &Transaction<'_>,
    term: &str,
    now: NaiveDateTime,
) -> StoreResult<SearchResults<ArtistSummary>> {
    let mut stmt = tx.prepare(
        "SELECT a.id, a.name,
                (SELECT COUNT(*) FROM shows s WHERE s.artist_id = a.id AND s.start_time > ?1)
         FROM artists a
         ORDER BY a.id",
    )?;
    let rows = stmt.query_map(params![format_timestamp(&now)], |row| {
        Ok(ArtistSummary {
            id: row.get(0)?,
            name: row.get(1)?,
            num_upcoming_shows: row.get(2)?,
        })
    })?;

    let needle = search_needle(term);
    let mut data = Vec::new();
    for row in rows {
        let summary = row?;
        if name_matches(&summary.name, &needle) {
            data.push(summary);
        }
    }
    Ok(SearchResults::new(data))
}

/// Splits `(start, item)` pairs, already in start order, into past and upcoming.
fn partition_by_start<T>(
    shows: Vec<(NaiveDateTime, T)>,
    now: NaiveDateTime,
) -> (Vec<T>, Vec<T>) {
    let mut past = Vec::new();
    let mut upcoming = Vec::new();
    for (start, item) in shows {
        if is_upcoming(start, now) {
            upcoming.push(item);
        } else {
            past.push(item);
        }
    }
    (past, upcoming)
}

fn shows_with_artist(
    tx: &Transaction<'_>,
    venue_id: i64,
) -> StoreResult<Vec<(NaiveDateTime, ShowWithArtist)>> {
    let mut stmt = tx.prepare(
        "SELECT s.start_time, a.id, a.name, a.image_link
         FROM shows s
         JOIN artists a ON a.id = s.artist_id
         WHERE s.venue_id = ?1
         ORDER BY s.start_time, s.id",
    )?;
    let rows = stmt.query_map(params![venue_id], |row| {
        let raw: String = row.get(0)?;
        let start = decode_start_time(raw.clone())?;
        Ok((
            start,
            ShowWithArtist {
                artist_id: row.get(1)?,
                artist_name: row.get(2)?,
                artist_image_link: row.get(3)?,
                start_time: raw,
            },
        ))
    })?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn shows_with_venue(
    tx: &Transaction<'_>,
    artist_id: i64,
) -> StoreResult<Vec<(NaiveDateTime, ShowWithVenue)>> {
    let mut stmt = tx.prepare(
        "SELECT s.start_time, v.id, v.name, v.image_link
         FROM shows s
         JOIN venues v ON v.id = s.venue_id
         WHERE s.artist_id = ?1
         ORDER BY s.start_time, s.id",
    )?;
    let rows = stmt.query_map(params![artist_id], |row| {
        let raw: String = row.get(0)?;
        let start = decode_start_time(raw.clone())?;
        Ok((
            start,
            ShowWithVenue {
                venue_id: row.get(1)?,
                venue_name: row.get(2)?,
                venue_image_link: row.get(3)?,
                start_time: raw,
            },
        ))
    })?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn venue_detail(
    tx: &Transaction<'_>,
    id: i64,
    now: NaiveDateTime,
) -> StoreResult<VenueDetail> {
    let venue = db::get_venue(tx, id)?;
    let (past, upcoming) = partition_by_start(shows_with_artist(tx, id)?, now);
    Ok(VenueDetail::from_record(venue, past, upcoming))
}

pub fn artist_detail(
    tx: &Transaction<'_>,
    id: i64,
    now: NaiveDateTime,
) -> StoreResult<ArtistDetail> {
    let artist = db::get_artist(tx, id)?;
    let (past, upcoming) = partition_by_start(shows_with_venue(tx, id)?, now);
    Ok(ArtistDetail::from_record(artist, past, upcoming))
}

pub fn list_shows(tx: &Transaction<'_>) -> StoreResult<Vec<ShowWithNames>> {
    let mut stmt = tx.prepare(
        "SELECT s.id, v.id, v.name, a.id, a.name, a.image_link, s.start_time
         FROM shows s
         JOIN venues v ON v.id = s.venue_id
         JOIN artists a ON a.id = s.artist_id
         ORDER BY s.id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(ShowWithNames {
            id: row.get(0)?,
            venue_id: row.get(1)?,
            venue_name: row.get(2)?,
            artist_id: row.get(3)?,
            artist_name: row.get(4)?,
            artist_image_link: row.get(5)?,
            start_time: row.get(6)?,
        })
    })?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
