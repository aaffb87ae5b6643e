use askama::Template;

use crate::forms::{ArtistForm, ChoiceOption, ShowForm, VenueForm};
use crate::models::parse_timestamp;
use crate::views::{
    Area, ArtistDetail, ArtistListing, ArtistSummary, SearchResults, ShowWithNames, VenueDetail,
    VenueSummary,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateStyle {
    /// `EE MM, dd, y h:mma`, e.g. `Tue 05, 21, 2019 9:30PM`.
    Medium,
    /// `EEEE MMMM, d, y 'at' h:mma`, e.g. `Tuesday May, 21, 2019 at 9:30PM`.
    Full,
}

/// Formats a stored start time for display. Text that is not a stored
/// timestamp is shown unchanged.
pub fn format_datetime(value: &str, style: DateStyle) -> String {
    let Some(parsed) = parse_timestamp(value) else {
        return value.to_string();
    };
    let pattern = match style {
        DateStyle::Medium => "%a %m, %d, %Y %-I:%M%p",
        DateStyle::Full => "%A %B, %-d, %Y at %-I:%M%p",
    };
    parsed.format(pattern).to_string()
}

mod filters {
    use super::{format_datetime, DateStyle};

    pub fn datetime<T: std::fmt::Display>(value: T) -> ::askama::Result<String> {
        Ok(format_datetime(&value.to_string(), DateStyle::Medium))
    }

    pub fn datetime_full<T: std::fmt::Display>(value: T) -> ::askama::Result<String> {
        Ok(format_datetime(&value.to_string(), DateStyle::Full))
    }
}

#[derive(Template)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub flash: Option<String>,
}

#[derive(Template)]
#[template(path = "pages/venues.html")]
pub struct VenuesTemplate {
    pub flash: Option<String>,
    pub areas: Vec<Area>,
}

#[derive(Template)]
#[template(path = "pages/search_venues.html")]
pub struct SearchVenuesTemplate {
    pub flash: Option<String>,
    pub results: SearchResults<VenueSummary>,
    pub search_term: String,
}

#[derive(Template)]
#[template(path = "pages/show_venue.html")]
pub struct VenueTemplate {
    pub flash: Option<String>,
    pub venue: VenueDetail,
}

#[derive(Template)]
#[template(path = "pages/artists.html")]
pub struct ArtistsTemplate {
    pub flash: Option<String>,
    pub artists: Vec<ArtistListing>,
}

#[derive(Template)]
#[template(path = "pages/search_artists.html")]
pub struct SearchArtistsTemplate {
    pub flash: Option<String>,
    pub results: SearchResults<ArtistSummary>,
    pub search_term: String,
}

#[derive(Template)]
#[template(path = "pages/show_artist.html")]
pub struct ArtistTemplate {
    pub flash: Option<String>,
    pub artist: ArtistDetail,
}

#[derive(Template)]
#[template(path = "pages/shows.html")]
pub struct ShowsTemplate {
    pub flash: Option<String>,
    pub shows: Vec<ShowWithNames>,
}

/// Shared by the new and edit venue pages; `action` is where the form posts.
#[derive(Template)]
#[template(path = "forms/venue.html")]
pub struct VenueFormTemplate {
    pub flash: Option<String>,
    pub title: String,
    pub action: String,
    pub form: VenueForm,
    pub genres: Vec<ChoiceOption>,
    pub states: Vec<ChoiceOption>,
}

#[derive(Template)]
#[template(path = "forms/artist.html")]
pub struct ArtistFormTemplate {
    pub flash: Option<String>,
    pub title: String,
    pub action: String,
    pub form: ArtistForm,
    pub genres: Vec<ChoiceOption>,
    pub states: Vec<ChoiceOption>,
}

#[derive(Template)]
#[template(path = "forms/new_show.html")]
pub struct ShowFormTemplate {
    pub flash: Option<String>,
    pub form: ShowForm,
}

#[derive(Template)]
#[template(path = "errors/404.html")]
pub struct NotFoundTemplate {
    pub flash: Option<String>,
}

#[derive(Template)]
#[template(path = "errors/500.html")]
pub struct ServerErrorTemplate {
    pub flash: Option<String>,
}
