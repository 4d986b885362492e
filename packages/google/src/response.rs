//! Parsing of Google web service JSON bodies.
//!
//! Every endpoint wraps its payload in an envelope with a `status` code and
//! an optional `error_message`.

use geo_suggest_models::{
    DetailsResponse, GeocodeResponse, RawGeocodeResult, RawPrediction, ServiceStatus,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::GoogleError;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

fn envelope(body: &serde_json::Value) -> Result<(ServiceStatus, Option<String>), GoogleError> {
    let envelope = Envelope::deserialize(body).map_err(|e| GoogleError::Parse {
        message: e.to_string(),
    })?;
    let status = envelope.status.ok_or_else(|| GoogleError::Parse {
        message: "Missing status".to_string(),
    })?;
    Ok((ServiceStatus::from_code(&status), envelope.error_message))
}

fn field<T: DeserializeOwned + Default>(
    body: &serde_json::Value,
    name: &str,
) -> Result<T, GoogleError> {
    body.get(name).map_or_else(
        || Ok(T::default()),
        |value| {
            T::deserialize(value).map_err(|e| GoogleError::Parse {
                message: format!("Invalid {name}: {e}"),
            })
        },
    )
}

/// Parses an autocomplete body.
///
/// `ZERO_RESULTS` yields an empty list; any other non-OK status is an error.
///
/// # Errors
///
/// Returns [`GoogleError::Status`] for failure statuses and
/// [`GoogleError::Parse`] for malformed bodies.
pub fn parse_autocomplete(body: &serde_json::Value) -> Result<Vec<RawPrediction>, GoogleError> {
    let (status, message) = envelope(body)?;
    match status {
        ServiceStatus::Ok => field(body, "predictions"),
        ServiceStatus::ZeroResults => Ok(Vec::new()),
        status => Err(GoogleError::Status { status, message }),
    }
}

/// Parses a place-details body.
///
/// # Errors
///
/// Returns [`GoogleError::Parse`] if the body is malformed.
pub fn parse_details(body: &serde_json::Value) -> Result<DetailsResponse, GoogleError> {
    let (status, message) = envelope(body)?;
    if !status.is_ok() {
        log::debug!(
            "Place details status {status}: {}",
            message.as_deref().unwrap_or("")
        );
        return Ok(DetailsResponse {
            result: None,
            status,
        });
    }

    let result: Option<RawGeocodeResult> = field(body, "result")?;
    Ok(DetailsResponse { result, status })
}

/// Parses a geocoding body.
///
/// # Errors
///
/// Returns [`GoogleError::Parse`] if the body is malformed.
pub fn parse_geocode(body: &serde_json::Value) -> Result<GeocodeResponse, GoogleError> {
    let (status, message) = envelope(body)?;
    if !status.is_ok() {
        log::debug!(
            "Geocode status {status}: {}",
            message.as_deref().unwrap_or("")
        );
        return Ok(GeocodeResponse {
            results: Vec::new(),
            status,
        });
    }

    let results = field(body, "results")?;
    Ok(GeocodeResponse { results, status })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_predictions() {
        let body = serde_json::json!({
            "status": "OK",
            "predictions": [{
                "place_id": "ChIJ1",
                "description": "400 Broadway, Seattle, WA, USA",
                "matched_substrings": [{ "offset": 0, "length": 3 }, { "offset": 4, "length": 8 }],
                "types": ["street_address", "geocode"],
                "structured_formatting": { "main_text": "400 Broadway" }
            }]
        });

        let predictions = parse_autocomplete(&body).unwrap();
        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0].place_id, "ChIJ1");
        assert_eq!(predictions[0].matched_substrings.len(), 2);
    }

    #[test]
    fn zero_results_is_empty() {
        let body = serde_json::json!({ "status": "ZERO_RESULTS", "predictions": [] });
        assert!(parse_autocomplete(&body).unwrap().is_empty());
    }

    #[test]
    fn denied_autocomplete_is_an_error() {
        let body = serde_json::json!({
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid."
        });

        let err = parse_autocomplete(&body).unwrap_err();
        assert!(matches!(
            err,
            GoogleError::Status {
                status: ServiceStatus::RequestDenied,
                ..
            }
        ));
        assert!(err.to_string().contains("API key is invalid"));
    }

    #[test]
    fn parses_details() {
        let body = serde_json::json!({
            "status": "OK",
            "result": {
                "name": "Pike Place Market",
                "formatted_address": "85 Pike St, Seattle, WA 98101, USA",
                "adr_address": "<span class=\"street-address\">85 Pike St</span>",
                "types": ["point_of_interest"],
                "geometry": { "location": { "lat": 47.6097, "lng": -122.3422 } },
                "address_components": [
                    { "long_name": "Seattle", "short_name": "Seattle", "types": ["locality", "political"] }
                ]
            }
        });

        let response = parse_details(&body).unwrap();
        assert_eq!(response.status, ServiceStatus::Ok);
        let result = response.result.unwrap();
        assert_eq!(result.name.as_deref(), Some("Pike Place Market"));
        assert!((result.location().unwrap().lat - 47.6097).abs() < 1e-9);
        assert_eq!(result.address_components[0].types[0], "locality");
    }

    #[test]
    fn details_failure_keeps_status() {
        let body = serde_json::json!({ "status": "NOT_FOUND" });
        let response = parse_details(&body).unwrap();
        assert_eq!(response.status, ServiceStatus::NotFound);
        assert!(response.result.is_none());
    }

    #[test]
    fn parses_geocode_results() {
        let body = serde_json::json!({
            "status": "OK",
            "results": [
                { "formatted_address": "Seattle, WA, USA", "types": ["locality"] },
                { "formatted_address": "Seattle, Tacoma, WA, USA" }
            ]
        });

        let response = parse_geocode(&body).unwrap();
        assert_eq!(response.results.len(), 2);
        assert_eq!(
            response.results[0].formatted_address.as_deref(),
            Some("Seattle, WA, USA")
        );
    }

    #[test]
    fn unknown_status_maps_to_unknown_error() {
        let body = serde_json::json!({ "status": "BRAND_NEW_STATUS" });
        assert_eq!(
            parse_geocode(&body).unwrap().status,
            ServiceStatus::UnknownError
        );
    }

    #[test]
    fn missing_status_is_a_parse_error() {
        let body = serde_json::json!({ "results": [] });
        assert!(matches!(
            parse_geocode(&body),
            Err(GoogleError::Parse { .. })
        ));
    }
}
