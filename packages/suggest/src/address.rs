//! Postal address normalization for place and geocoder results.
//!
//! Place results describe addresses in several overlapping ways:
//! - Structured components: `{ types: ["route"], long_name: "Main Street" }`
//! - An `adr` microformat fragment: `<span class="street-address">42 Main St</span>`
//! - A bare place name: `"Joe's Cafe"`
//!
//! This module combines them into a best-effort [`NormalizedAddress`]
//! suitable for shipping forms.

use geo_suggest_models::{
    AddressComponent, AddressComponentMap, ComponentName, GeocodedSuggestion, NormalizedAddress,
    NormalizedSuggestion, RawGeocodeResult,
};

use crate::extract::{REGION_RE, STREET_ADDRESS_RE, extract};

/// Placeholder locality used when stripping the `", <locality>"` suffix of a
/// street address whose result has no locality component.
const NO_LOCALITY: &str = "NO MATCH";

/// Result types that already describe a street-level place.
const STREET_LEVEL_TYPES: &[&str] = &["street_address", "route"];

/// Output of [`normalize_address`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressNormalization {
    /// Postal address decomposition.
    pub normalized_address: NormalizedAddress,
    /// Components keyed by type.
    pub address_component_map: AddressComponentMap,
    /// Region, duplicated from `normalized_address` for convenience.
    pub region: Option<String>,
}

/// Indexes address components by each of their types.
///
/// Later components overwrite earlier ones registered under the same type.
#[must_use]
pub fn build_component_map(components: &[AddressComponent]) -> AddressComponentMap {
    let mut map = AddressComponentMap::default();
    for component in components {
        for component_type in &component.types {
            map.insert(
                component_type.clone(),
                ComponentName {
                    long_name: component.long_name.clone(),
                    short_name: component.short_name.clone(),
                },
            );
        }
    }
    map
}

/// Decomposes a raw result into a [`NormalizedAddress`].
///
/// Street lines come from the `street-address` microformat when present.
/// Otherwise the place name is used, and for places below street level
/// (points of interest) the name moves to the second line while the first
/// line is rebuilt from the `route` and `street_number` components.
#[must_use]
pub fn normalize_address(raw: &RawGeocodeResult) -> AddressNormalization {
    let map = build_component_map(&raw.address_components);

    let locality = map.get("locality");
    let aal1 = map.get("administrative_area_level_1");

    let (street_address1, street_address2) = street_lines(raw, &map);

    let region = first_non_empty([
        Some(extract(raw.adr_address.as_deref(), &REGION_RE)),
        locality.map(|c| c.short_name.clone()),
        aal1.map(|c| c.short_name.clone()),
    ]);

    let city = first_non_empty([
        locality.map(|c| c.long_name.clone()),
        aal1.map(|c| c.long_name.clone()),
    ]);

    let normalized_address = NormalizedAddress {
        street_address1,
        street_address2,
        region: region.clone(),
        city,
        postal_code: map.get("postal_code").map(|c| c.long_name.clone()),
        country_name: map.get("country").map(|c| c.long_name.clone()),
        country_iso2: map.get("country").map(|c| c.short_name.clone()),
    };

    AddressNormalization {
        normalized_address,
        address_component_map: map,
        region,
    }
}

/// Merges a suggestion with the details resolved for it.
#[must_use]
pub fn build_geocoded_suggestion(
    suggestion: NormalizedSuggestion,
    raw: RawGeocodeResult,
) -> GeocodedSuggestion {
    let AddressNormalization {
        normalized_address,
        address_component_map,
        region,
    } = normalize_address(&raw);

    GeocodedSuggestion {
        suggestion,
        location: raw.location(),
        normalized_address,
        address_component_map,
        region,
        formatted_address: raw.formatted_address.clone(),
        name: raw.name.clone(),
        types: raw.types.clone(),
        raw,
    }
}

/// Computes the two street lines.
fn street_lines(
    raw: &RawGeocodeResult,
    map: &AddressComponentMap,
) -> (Option<String>, Option<String>) {
    let locality_name = map
        .get("locality")
        .map(|c| c.long_name.as_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(NO_LOCALITY);

    let street_address = extract(raw.adr_address.as_deref(), &STREET_ADDRESS_RE).replacen(
        &format!(", {locality_name}"),
        "",
        1,
    );

    if !street_address.is_empty() {
        let street_address2 = match &raw.name {
            Some(name) if *name == street_address => Some(String::new()),
            other => other.clone(),
        };
        return (Some(street_address), street_address2);
    }

    let below_street_level = !raw
        .types
        .iter()
        .any(|t| STREET_LEVEL_TYPES.contains(&t.as_str()));

    match map.get("route") {
        Some(route) if below_street_level => {
            let mut street_address1 = route.long_name.clone();
            if let Some(number) = map.get("street_number") {
                street_address1.push_str(", ");
                street_address1.push_str(&number.short_name);
            }
            (Some(street_address1), raw.name.clone())
        }
        _ => (raw.name.clone(), None),
    }
}

/// Returns the first candidate that is present and non-empty.
fn first_non_empty<const N: usize>(candidates: [Option<String>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .find(|value| !value.is_empty())
}
