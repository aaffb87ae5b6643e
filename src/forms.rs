//! Form payloads for the create and edit pages, and their validation into
//! store-ready field sets.

use chrono::{Datelike, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::error::StoreError;
use crate::models::{format_timestamp, Artist, ArtistFields, ShowFields, Venue, VenueFields};
use crate::utils::non_blank;

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9+().\- ]+$").expect("valid phone regex"));
static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https?://[^\s/$.?#][^\s]*$").expect("valid url regex"));

pub const GENRES: [&str; 19] = [
    "Alternative",
    "Blues",
    "Classical",
    "Country",
    "Electronic",
    "Folk",
    "Funk",
    "Hip-Hop",
    "Heavy Metal",
    "Instrumental",
    "Jazz",
    "Musical Theatre",
    "Pop",
    "Punk",
    "R&B",
    "Reggae",
    "Rock n Roll",
    "Soul",
    "Other",
];

pub const STATES: [&str; 51] = [
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "DC", "FL", "GA", "HI", "ID", "IL", "IN",
    "IA", "KS", "KY", "LA", "ME", "MT", "NE", "NV", "NH", "NJ", "NM", "NY", "NC", "ND", "OH",
    "OK", "OR", "MD", "MA", "MI", "MN", "MS", "MO", "PA", "RI", "SC", "SD", "TN", "TX", "UT",
    "VT", "VA", "WA", "WV", "WI", "WY",
];

/// One `<option>` of a select box.
#[derive(Clone, Debug, PartialEq)]
pub struct ChoiceOption {
    pub value: String,
    pub selected: bool,
}

pub fn genre_options(selected: &[String]) -> Vec<ChoiceOption> {
    GENRES
        .iter()
        .map(|genre| ChoiceOption {
            value: genre.to_string(),
            selected: selected.iter().any(|s| s == genre),
        })
        .collect()
}

/// State choices; a stored value outside the list is kept as an extra option
/// so editing never silently changes it.
pub fn state_options(selected: &str) -> Vec<ChoiceOption> {
    let mut options: Vec<ChoiceOption> = STATES
        .iter()
        .map(|state| ChoiceOption {
            value: state.to_string(),
            selected: *state == selected,
        })
        .collect();
    if !selected.is_empty() && !STATES.contains(&selected) {
        options.insert(
            0,
            ChoiceOption {
                value: selected.to_string(),
                selected: true,
            },
        );
    }
    options
}

#[derive(Default)]
struct Problems(Vec<String>);

impl Problems {
    fn required(&mut self, label: &str, value: &str) -> String {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.0.push(format!("{label} is required"));
        }
        trimmed.to_string()
    }

    fn phone(&mut self, value: &str) -> String {
        let phone = self.required("phone", value);
        if !phone.is_empty()
            && (!PHONE_RE.is_match(&phone) || !phone.chars().any(|c| c.is_ascii_digit()))
        {
            self.0.push(format!("phone {phone:?} is not a phone number"));
        }
        phone
    }

    fn url(&mut self, label: &str, value: &str) -> Option<String> {
        let url = non_blank(value)?;
        if !URL_RE.is_match(&url) {
            self.0.push(format!("{label} must be an http(s) URL"));
        }
        Some(url)
    }

    fn genres(&mut self, values: &[String]) -> Vec<String> {
        let mut genres: Vec<String> = Vec::new();
        for value in values {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            if !GENRES.contains(&value) {
                self.0.push(format!("unknown genre {value:?}"));
            } else if !genres.iter().any(|g| g == value) {
                genres.push(value.to_string());
            }
        }
        if genres.is_empty() && self.0.iter().all(|p| !p.starts_with("unknown genre")) {
            self.0.push("at least one genre is required".to_string());
        }
        genres
    }

    fn id(&mut self, label: &str, value: &str) -> i64 {
        match value.trim().parse::<i64>() {
            Ok(id) if id > 0 => id,
            _ => {
                self.0.push(format!("{label} must be a positive integer"));
                0
            }
        }
    }

    fn start_time(&mut self, value: &str) -> Option<NaiveDateTime> {
        let parsed = parse_start_time(value);
        if parsed.is_none() {
            self.0.push(format!("start time {:?} is not a date and time", value.trim()));
        }
        parsed
    }

    fn finish<T>(self, value: T) -> Result<T, StoreError> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(StoreError::ConstraintViolation(self.0.join("; ")))
        }
    }
}

/// Accepts `YYYY-MM-DD HH:MM[:SS]` and the `T`-separated `datetime-local` form.
/// Years are limited to 1..=9999 so stored timestamps keep their fixed width.
pub fn parse_start_time(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .filter(|parsed| (1..=9999).contains(&parsed.year()))
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(default)]
pub struct VenueForm {
    pub name: String,
    pub city: String,
    pub state: String,
    pub address: String,
    pub phone: String,
    pub genres: Vec<String>,
    pub image_link: String,
    pub website_link: String,
    pub facebook_link: String,
    pub seeking_talent: Option<String>,
    pub seeking_description: String,
}

impl VenueForm {
    pub fn from_venue(venue: &Venue) -> Self {
        Self {
            name: venue.name.clone(),
            city: venue.city.clone(),
            state: venue.state.clone(),
            address: venue.address.clone(),
            phone: venue.phone.clone(),
            genres: venue.genres.clone(),
            image_link: venue.image_link.clone().unwrap_or_default(),
            website_link: venue.website_link.clone().unwrap_or_default(),
            facebook_link: venue.facebook_link.clone().unwrap_or_default(),
            seeking_talent: venue.seeking_talent.then(|| "y".to_string()),
            seeking_description: venue.seeking_description.clone().unwrap_or_default(),
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.trim()
    }

    pub fn seeking(&self) -> bool {
        self.seeking_talent.is_some()
    }

    pub fn validate(&self) -> Result<VenueFields, StoreError> {
        let mut problems = Problems::default();
        let fields = VenueFields {
            name: problems.required("name", &self.name),
            city: problems.required("city", &self.city),
            state: problems.required("state", &self.state),
            address: problems.required("address", &self.address),
            phone: problems.phone(&self.phone),
            genres: problems.genres(&self.genres),
            image_link: problems.url("image link", &self.image_link),
            website_link: problems.url("website link", &self.website_link),
            facebook_link: problems.url("facebook link", &self.facebook_link),
            seeking_talent: self.seeking(),
            seeking_description: non_blank(&self.seeking_description),
        };
        problems.finish(fields)
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(default)]
pub struct ArtistForm {
    pub name: String,
    pub city: String,
    pub state: String,
    pub phone: String,
    pub genres: Vec<String>,
    pub image_link: String,
    pub website_link: String,
    pub facebook_link: String,
    pub seeking_venue: Option<String>,
    pub seeking_description: String,
}

impl ArtistForm {
    pub fn from_artist(artist: &Artist) -> Self {
        Self {
            name: artist.name.clone(),
            city: artist.city.clone(),
            state: artist.state.clone(),
            phone: artist.phone.clone(),
            genres: artist.genres.clone(),
            image_link: artist.image_link.clone().unwrap_or_default(),
            website_link: artist.website_link.clone().unwrap_or_default(),
            facebook_link: artist.facebook_link.clone().unwrap_or_default(),
            seeking_venue: artist.seeking_venue.then(|| "y".to_string()),
            seeking_description: artist.seeking_description.clone().unwrap_or_default(),
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.trim()
    }

    pub fn seeking(&self) -> bool {
        self.seeking_venue.is_some()
    }

    pub fn validate(&self) -> Result<ArtistFields, StoreError> {
        let mut problems = Problems::default();
        let fields = ArtistFields {
            name: problems.required("name", &self.name),
            city: problems.required("city", &self.city),
            state: problems.required("state", &self.state),
            phone: problems.phone(&self.phone),
            genres: problems.genres(&self.genres),
            image_link: problems.url("image link", &self.image_link),
            website_link: problems.url("website link", &self.website_link),
            facebook_link: problems.url("facebook link", &self.facebook_link),
            seeking_venue: self.seeking(),
            seeking_description: non_blank(&self.seeking_description),
        };
        problems.finish(fields)
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(default)]
pub struct ShowForm {
    pub artist_id: String,
    pub venue_id: String,
    pub start_time: String,
}

impl ShowForm {
    /// Blank form with the start time prefilled to `now`.
    pub fn starting_at(now: NaiveDateTime) -> Self {
        Self {
            start_time: format_timestamp(&now),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<ShowFields, StoreError> {
        let mut problems = Problems::default();
        let artist_id = problems.id("artist id", &self.artist_id);
        let venue_id = problems.id("venue id", &self.venue_id);
        let start_time = problems.start_time(&self.start_time);
        match start_time {
            Some(start_time) => problems.finish(ShowFields {
                artist_id,
                venue_id,
                start_time,
            }),
            None => Err(StoreError::ConstraintViolation(problems.0.join("; "))),
        }
    }
}

/// Search box payload shared by the venue and artist search pages.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(default)]
pub struct SearchForm {
    pub search_term: String,
}
