#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for place suggestions and address normalization.
//!
//! ```text
//! geo_suggest suggest "400 Broadw" [--select 0]
//! geo_suggest geocode "1600 Amphitheatre Pkwy, Mountain View"
//! geo_suggest normalize details.json
//! geo_suggest script-tag --key <KEY> [--version 3.55]
//! ```
//!
//! `suggest` and `geocode` call the Google web services and need
//! `GOOGLE_MAPS_API_KEY`. `normalize` and `script-tag` work offline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use geo_suggest::address::build_geocoded_suggestion;
use geo_suggest::loader::{ApiKey, PageGlobals, load_gmaps};
use geo_suggest::provider::PlacesProvider;
use geo_suggest::{GeoSuggest, SuggestConfig, SuggestEvent};
use geo_suggest_google::GooglePlacesClient;
use geo_suggest_models::{GeocodedSuggestion, NormalizedSuggestion, RawGeocodeResult};
use serde::Deserialize;
use thiserror::Error;

#[derive(Parser)]
#[command(
    name = "geo_suggest",
    about = "Search places and normalize postal addresses"
)]
struct Cli {
    /// Suggest configuration file (TOML); defaults to the embedded one
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print autocomplete suggestions for a partial address
    Suggest {
        /// Search text
        text: String,
        /// Geocode the suggestion at this index and print it
        #[arg(long)]
        select: Option<usize>,
    },
    /// Geocode free text and print the normalized address
    Geocode {
        /// Address text
        address: String,
    },
    /// Normalize provider results read from a JSON file
    ///
    /// Accepts a place-details body, a geocoder body, a single result, or
    /// an array of results.
    Normalize {
        /// Path to the JSON file
        file: PathBuf,
    },
    /// Print the script tag that loads the places library
    ScriptTag {
        /// API key
        #[arg(long, conflicts_with = "params", required_unless_present = "params")]
        key: Option<String>,
        /// URL parameters as a JSON object (e.g. `{"client":"gme-acme"}`)
        #[arg(long)]
        params: Option<String>,
        /// API version appended as `v=`
        #[arg(long)]
        version: Option<String>,
        /// What the page already has loaded
        #[arg(long, value_enum, default_value_t = Page::Empty)]
        page: Page,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Page {
    Empty,
    MapsWithPlaces,
    MapsWithoutPlaces,
}

impl From<Page> for PageGlobals {
    fn from(page: Page) -> Self {
        match page {
            Page::Empty => Self::Empty,
            Page::MapsWithPlaces => Self::MapsWithPlaces,
            Page::MapsWithoutPlaces => Self::MapsWithoutPlaces,
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error("No suggestion at index {index} ({count} available)")]
    SuggestionIndex { index: usize, count: usize },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Unrecognized results file {path}: {source}")]
    Input {
        path: String,
        source: serde_json::Error,
    },
}

/// Accepted shapes of a `normalize` input file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResultsFile {
    Details { result: RawGeocodeResult },
    Geocode { results: Vec<RawGeocodeResult> },
    Many(Vec<RawGeocodeResult>),
    One(RawGeocodeResult),
}

impl ResultsFile {
    fn into_results(self) -> Vec<RawGeocodeResult> {
        match self {
            Self::Details { result } | Self::One(result) => vec![result],
            Self::Geocode { results } | Self::Many(results) => results,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SuggestConfig::load(path)?,
        None => SuggestConfig::default(),
    };

    match cli.command {
        Commands::Suggest { text, select } => {
            let (geo, events) = google_session(config)?;
            let suggestions = geo.search(&text).await?.unwrap_or_default();

            match select {
                None => print_json(&suggestions)?,
                Some(index) => {
                    let suggestion = suggestions.get(index).cloned().ok_or(
                        CliError::SuggestionIndex {
                            index,
                            count: suggestions.len(),
                        },
                    )?;
                    print_geocoded(geo.select(suggestion).await?.as_ref())?;
                }
            }

            log_events(events);
        }
        Commands::Geocode { address } => {
            let (geo, events) = google_session(config)?;
            let geocoded = geo.select(NormalizedSuggestion::fixture(address)).await?;
            print_geocoded(geocoded.as_ref())?;
            log_events(events);
        }
        Commands::Normalize { file } => {
            let geocoded = normalize_file(&file)?;
            print_json(&geocoded)?;
        }
        Commands::ScriptTag {
            key,
            params,
            version,
            page,
        } => {
            let api_key = match key {
                Some(key) => ApiKey::Key(key),
                None => ApiKey::from_value(&serde_json::from_str(
                    params.as_deref().unwrap_or("null"),
                )?)?,
            };

            match load_gmaps(page.into(), &api_key, version.as_deref())? {
                Some(tag) => println!("{tag}"),
                None => println!("Places library already loaded"),
            }
        }
    }

    Ok(())
}

fn google_session(
    config: SuggestConfig,
) -> Result<(GeoSuggest, tokio::sync::mpsc::UnboundedReceiver<SuggestEvent>), Box<dyn std::error::Error>>
{
    let provider: Arc<dyn PlacesProvider> = Arc::new(GooglePlacesClient::from_env()?);
    Ok(GeoSuggest::new(config, Some(provider)))
}

fn normalize_file(path: &Path) -> Result<Vec<GeocodedSuggestion>, CliError> {
    let display = path.display().to_string();
    let contents = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: display.clone(),
        source,
    })?;
    let file: ResultsFile =
        serde_json::from_str(&contents).map_err(|source| CliError::Input {
            path: display,
            source,
        })?;

    Ok(file
        .into_results()
        .into_iter()
        .map(|raw| {
            let suggestion = NormalizedSuggestion {
                place_id: raw.place_id.clone(),
                description: raw
                    .formatted_address
                    .clone()
                    .or_else(|| raw.name.clone())
                    .unwrap_or_default(),
                ..NormalizedSuggestion::default()
            };
            build_geocoded_suggestion(suggestion, raw)
        })
        .collect())
}

fn print_geocoded(geocoded: Option<&GeocodedSuggestion>) -> Result<(), serde_json::Error> {
    match geocoded {
        Some(geocoded) => print_json(geocoded),
        None => {
            eprintln!("No result");
            Ok(())
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn log_events(mut events: tokio::sync::mpsc::UnboundedReceiver<SuggestEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            SuggestEvent::Suggestions(list) => log::debug!("Published {} suggestion(s)", list.len()),
            SuggestEvent::Geocoded(geocoded) => {
                log::debug!("Geocoded {:?}", geocoded.suggestion.description);
            }
            SuggestEvent::ServiceError(error) => log::warn!("Service error: {}", error.status),
        }
    }
}
