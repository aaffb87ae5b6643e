use std::path::Path;

use chrono::{Duration, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};

use crate::error::{StoreError, StoreResult};
use crate::models::{
    format_timestamp, parse_timestamp, Artist, ArtistFields, Show, ShowFields, Venue, VenueFields,
};
use crate::utils;

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> StoreResult<Self> {
        utils::ensure_parent(path);
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS venues(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                city TEXT NOT NULL,
                state TEXT NOT NULL,
                address TEXT NOT NULL,
                phone TEXT NOT NULL,
                genres TEXT NOT NULL,
                image_link TEXT,
                website_link TEXT,
                facebook_link TEXT,
                seeking_talent INTEGER NOT NULL DEFAULT 0,
                seeking_description TEXT
            );
            CREATE TABLE IF NOT EXISTS artists(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                city TEXT NOT NULL,
                state TEXT NOT NULL,
                phone TEXT NOT NULL,
                genres TEXT NOT NULL,
                image_link TEXT,
                website_link TEXT,
                facebook_link TEXT,
                seeking_venue INTEGER NOT NULL DEFAULT 0,
                seeking_description TEXT
            );
            CREATE TABLE IF NOT EXISTS shows(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                artist_id INTEGER NOT NULL REFERENCES artists(id) ON DELETE CASCADE,
                venue_id INTEGER NOT NULL REFERENCES venues(id) ON DELETE CASCADE,
                start_time TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_venues_area ON venues(city, state);
            CREATE INDEX IF NOT EXISTS idx_shows_venue ON shows(venue_id, start_time);
            CREATE INDEX IF NOT EXISTS idx_shows_artist ON shows(artist_id, start_time);",
        )?;
        Ok(())
    }

    /// Starts the request's unit of work. Dropping the transaction without
    /// committing rolls it back.
    pub fn transaction(&mut self) -> StoreResult<Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }

    /// Runs `op` in a fresh transaction and commits only if it succeeds.
    pub fn write<T, F>(&mut self, op: F) -> StoreResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> StoreResult<T>,
    {
        let tx = self.transaction()?;
        let out = op(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    pub fn read<T, F>(&mut self, op: F) -> StoreResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> StoreResult<T>,
    {
        let tx = self.transaction()?;
        let out = op(&tx)?;
        Ok(out)
    }

    pub fn seed_if_empty(&mut self, now: NaiveDateTime) -> StoreResult<bool> {
        self.write(|tx| {
            let count: i64 = tx.query_row("SELECT COUNT(*) FROM venues", [], |row| row.get(0))?;
            if count > 0 {
                return Ok(false);
            }

            let musical_hop = insert_venue(
                tx,
                &sample_venue("The Musical Hop", "San Francisco", "CA", "1015 Folsom Street"),
            )?;
            let dueling_pianos = insert_venue(
                tx,
                &sample_venue("The Dueling Pianos Bar", "New York", "NY", "335 Delancey Street"),
            )?;
            let park_square = insert_venue(
                tx,
                &sample_venue(
                    "Park Square Live Music & Coffee",
                    "San Francisco",
                    "CA",
                    "34 Whiskey Moore Ave",
                ),
            )?;

            let guns_n_petals =
                insert_artist(tx, &sample_artist("Guns N Petals", "San Francisco", "CA"))?;
            let matt_quevedo = insert_artist(tx, &sample_artist("Matt Quevedo", "New York", "NY"))?;
            let wild_sax =
                insert_artist(tx, &sample_artist("The Wild Sax Band", "San Francisco", "CA"))?;

            let shows = [
                (guns_n_petals, musical_hop, now - Duration::days(30)),
                (matt_quevedo, park_square, now - Duration::days(7)),
                (wild_sax, park_square, now + Duration::days(6)),
                (wild_sax, dueling_pianos, now + Duration::days(14)),
                (guns_n_petals, park_square, now + Duration::days(21)),
            ];
            for (artist_id, venue_id, start) in shows {
                insert_show(
                    tx,
                    &ShowFields {
                        artist_id,
                        venue_id,
                        start_time: start,
                    },
                )?;
            }
            Ok(true)
        })
    }
}

fn sample_venue(name: &str, city: &str, state: &str, address: &str) -> VenueFields {
    VenueFields {
        name: name.to_string(),
        city: city.to_string(),
        state: state.to_string(),
        address: address.to_string(),
        phone: "123-123-1234".to_string(),
        genres: vec!["Jazz".to_string(), "Folk".to_string()],
        image_link: None,
        website_link: None,
        facebook_link: None,
        seeking_talent: true,
        seeking_description: Some("Looking for local acts to fill weeknights.".to_string()),
    }
}

fn sample_artist(name: &str, city: &str, state: &str) -> ArtistFields {
    ArtistFields {
        name: name.to_string(),
        city: city.to_string(),
        state: state.to_string(),
        phone: "326-123-5000".to_string(),
        genres: vec!["Rock n Roll".to_string()],
        image_link: None,
        website_link: None,
        facebook_link: None,
        seeking_venue: false,
        seeking_description: None,
    }
}

fn decode_genres(raw: String) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(&raw).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(
            raw.len(),
            rusqlite::types::Type::Text,
            Box::new(err),
        )
    })
}

pub(crate) fn decode_start_time(raw: String) -> rusqlite::Result<NaiveDateTime> {
    parse_timestamp(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            raw.len(),
            rusqlite::types::Type::Text,
            format!("invalid start time {raw:?}").into(),
        )
    })
}

const VENUE_COLUMNS: &str = "id, name, city, state, address, phone, genres, image_link, \
     website_link, facebook_link, seeking_talent, seeking_description";

const ARTIST_COLUMNS: &str = "id, name, city, state, phone, genres, image_link, \
     website_link, facebook_link, seeking_venue, seeking_description";

fn venue_from_row(row: &Row<'_>) -> rusqlite::Result<Venue> {
    Ok(Venue {
        id: row.get(0)?,
        name: row.get(1)?,
        city: row.get(2)?,
        state: row.get(3)?,
        address: row.get(4)?,
        phone: row.get(5)?,
        genres: decode_genres(row.get(6)?)?,
        image_link: row.get(7)?,
        website_link: row.get(8)?,
        facebook_link: row.get(9)?,
        seeking_talent: row.get(10)?,
        seeking_description: row.get(11)?,
    })
}

fn artist_from_row(row: &Row<'_>) -> rusqlite::Result<Artist> {
    Ok(Artist {
        id: row.get(0)?,
        name: row.get(1)?,
        city: row.get(2)?,
        state: row.get(3)?,
        phone: row.get(4)?,
        genres: decode_genres(row.get(5)?)?,
        image_link: row.get(6)?,
        website_link: row.get(7)?,
        facebook_link: row.get(8)?,
        seeking_venue: row.get(9)?,
        seeking_description: row.get(10)?,
    })
}

fn show_from_row(row: &Row<'_>) -> rusqlite::Result<Show> {
    Ok(Show {
        id: row.get(0)?,
        artist_id: row.get(1)?,
        venue_id: row.get(2)?,
        start_time: decode_start_time(row.get(3)?)?,
    })
}

pub fn get_venue(tx: &Transaction<'_>, id: i64) -> StoreResult<Venue> {
    tx.query_row(
        &format!("SELECT {VENUE_COLUMNS} FROM venues WHERE id = ?1"),
        params![id],
        venue_from_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::not_found("venue", id))
}

pub fn get_artist(tx: &Transaction<'_>, id: i64) -> StoreResult<Artist> {
    tx.query_row(
        &format!("SELECT {ARTIST_COLUMNS} FROM artists WHERE id = ?1"),
        params![id],
        artist_from_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::not_found("artist", id))
}

pub fn get_show(tx: &Transaction<'_>, id: i64) -> StoreResult<Show> {
    tx.query_row(
        "SELECT id, artist_id, venue_id, start_time FROM shows WHERE id = ?1",
        params![id],
        show_from_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::not_found("show", id))
}

pub fn insert_venue(tx: &Transaction<'_>, fields: &VenueFields) -> StoreResult<i64> {
    let genres = serde_json::to_string(&fields.genres)?;
    tx.execute(
        "INSERT INTO venues (name, city, state, address, phone, genres, image_link,
             website_link, facebook_link, seeking_talent, seeking_description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            fields.name,
            fields.city,
            fields.state,
            fields.address,
            fields.phone,
            genres,
            fields.image_link,
            fields.website_link,
            fields.facebook_link,
            fields.seeking_talent,
            fields.seeking_description
        ],
    )?;
    Ok(tx.last_insert_rowid())
}

pub fn update_venue(tx: &Transaction<'_>, id: i64, fields: &VenueFields) -> StoreResult<()> {
    let genres = serde_json::to_string(&fields.genres)?;
    let changed = tx.execute(
        "UPDATE venues SET name = ?2, city = ?3, state = ?4, address = ?5, phone = ?6,
             genres = ?7, image_link = ?8, website_link = ?9, facebook_link = ?10,
             seeking_talent = ?11, seeking_description = ?12
         WHERE id = ?1",
        params![
            id,
            fields.name,
            fields.city,
            fields.state,
            fields.address,
            fields.phone,
            genres,
            fields.image_link,
            fields.website_link,
            fields.facebook_link,
            fields.seeking_talent,
            fields.seeking_description
        ],
    )?;
    if changed == 0 {
        return Err(StoreError::not_found("venue", id));
    }
    Ok(())
}

/// Removes the venue; its shows go with it through the cascading key.
pub fn delete_venue(tx: &Transaction<'_>, id: i64) -> StoreResult<()> {
    let changed = tx.execute("DELETE FROM venues WHERE id = ?1", params![id])?;
    if changed == 0 {
        return Err(StoreError::not_found("venue", id));
    }
    Ok(())
}

pub fn insert_artist(tx: &Transaction<'_>, fields: &ArtistFields) -> StoreResult<i64> {
    let genres = serde_json::to_string(&fields.genres)?;
    tx.execute(
        "INSERT INTO artists (name, city, state, phone, genres, image_link,
             website_link, facebook_link, seeking_venue, seeking_description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            fields.name,
            fields.city,
            fields.state,
            fields.phone,
            genres,
            fields.image_link,
            fields.website_link,
            fields.facebook_link,
            fields.seeking_venue,
            fields.seeking_description
        ],
    )?;
    Ok(tx.last_insert_rowid())
}

pub fn update_artist(tx: &Transaction<'_>, id: i64, fields: &ArtistFields) -> StoreResult<()> {
    let genres = serde_json::to_string(&fields.genres)?;
    let changed = tx.execute(
        "UPDATE artists SET name = ?2, city = ?3, state = ?4, phone = ?5, genres = ?6,
             image_link = ?7, website_link = ?8, facebook_link = ?9,
             seeking_venue = ?10, seeking_description = ?11
         WHERE id = ?1",
        params![
            id,
            fields.name,
            fields.city,
            fields.state,
            fields.phone,
            genres,
            fields.image_link,
            fields.website_link,
            fields.facebook_link,
            fields.seeking_venue,
            fields.seeking_description
        ],
    )?;
    if changed == 0 {
        return Err(StoreError::not_found("artist", id));
    }
    Ok(())
}

pub fn delete_artist(tx: &Transaction<'_>, id: i64) -> StoreResult<()> {
    let changed = tx.execute("DELETE FROM artists WHERE id = ?1", params![id])?;
    if changed == 0 {
        return Err(StoreError::not_found("artist", id));
    }
    Ok(())
}

fn exists(tx: &Transaction<'_>, table: &str, id: i64) -> StoreResult<bool> {
    let found: Option<i64> = tx
        .query_row(
            &format!("SELECT id FROM {table} WHERE id = ?1"),
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn insert_show(tx: &Transaction<'_>, fields: &ShowFields) -> StoreResult<i64> {
    if !exists(tx, "artists", fields.artist_id)? {
        return Err(StoreError::ConstraintViolation(format!(
            "artist {} does not exist",
            fields.artist_id
        )));
    }
    if !exists(tx, "venues", fields.venue_id)? {
        return Err(StoreError::ConstraintViolation(format!(
            "venue {} does not exist",
            fields.venue_id
        )));
    }
    tx.execute(
        "INSERT INTO shows (artist_id, venue_id, start_time) VALUES (?1, ?2, ?3)",
        params![
            fields.artist_id,
            fields.venue_id,
            format_timestamp(&fields.start_time)
        ],
    )?;
    Ok(tx.last_insert_rowid())
}

pub fn delete_show(tx: &Transaction<'_>, id: i64) -> StoreResult<()> {
    let changed = tx.execute("DELETE FROM shows WHERE id = ?1", params![id])?;
    if changed == 0 {
        return Err(StoreError::not_found("show", id));
    }
    Ok(())
}
