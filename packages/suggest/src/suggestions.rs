//! Reshaping of raw autocomplete predictions into [`NormalizedSuggestion`]s.

use std::sync::Arc;

use geo_suggest_models::{NormalizedSuggestion, RawPrediction};

/// Predicate deciding whether a prediction is dropped.
pub type SkipFn = Arc<dyn Fn(&RawPrediction) -> bool + Send + Sync>;

/// Function computing a display label for a prediction.
pub type LabelFn = Arc<dyn Fn(&RawPrediction) -> String + Send + Sync>;

/// Caller hooks applied while normalizing predictions.
#[derive(Clone, Default)]
pub struct NormalizeOptions {
    /// Drops predictions for which this returns `true`.
    pub skip: Option<SkipFn>,
    /// Computes `label`; the label is empty without it.
    pub label: Option<LabelFn>,
}

impl NormalizeOptions {
    /// Sets the skip predicate.
    #[must_use]
    pub fn with_skip(
        mut self,
        skip: impl Fn(&RawPrediction) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.skip = Some(Arc::new(skip));
        self
    }

    /// Sets the label function.
    #[must_use]
    pub fn with_label(
        mut self,
        label: impl Fn(&RawPrediction) -> String + Send + Sync + 'static,
    ) -> Self {
        self.label = Some(Arc::new(label));
        self
    }
}

impl std::fmt::Debug for NormalizeOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NormalizeOptions")
            .field("skip", &self.skip.is_some())
            .field("label", &self.label.is_some())
            .finish()
    }
}

/// Normalizes a list of raw predictions, preserving order.
///
/// Only the first matched-substring range of each prediction is kept.
#[must_use]
pub fn normalize_suggestions(
    raw: &[RawPrediction],
    options: &NormalizeOptions,
) -> Vec<NormalizedSuggestion> {
    raw.iter()
        .filter(|prediction| !options.skip.as_ref().is_some_and(|skip| skip(*prediction)))
        .map(|prediction| NormalizedSuggestion {
            place_id: Some(prediction.place_id.clone()),
            description: prediction.description.clone(),
            matched_substrings: prediction.matched_substrings.first().copied(),
            label: options
                .label
                .as_ref()
                .map(|label| label(prediction))
                .unwrap_or_default(),
            is_fixture: false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use geo_suggest_models::MatchedSubstring;

    use super::*;

    fn prediction(place_id: &str, description: &str, ranges: &[(u32, u32)]) -> RawPrediction {
        RawPrediction {
            place_id: place_id.to_string(),
            description: description.to_string(),
            matched_substrings: ranges
                .iter()
                .map(|&(offset, length)| MatchedSubstring { offset, length })
                .collect(),
            types: Vec::new(),
        }
    }

    #[test]
    fn keeps_first_range_only() {
        let raw = vec![prediction("place", "description", &[(0, 4), (6, 2)])];
        let normalized = normalize_suggestions(&raw, &NormalizeOptions::default());

        assert_eq!(
            normalized,
            vec![NormalizedSuggestion {
                place_id: Some("place".to_string()),
                description: "description".to_string(),
                matched_substrings: Some(MatchedSubstring {
                    offset: 0,
                    length: 4
                }),
                label: String::new(),
                is_fixture: false,
            }]
        );
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(normalize_suggestions(&[], &NormalizeOptions::default()).is_empty());
    }

    #[test]
    fn skip_filters_and_preserves_order() {
        let raw = vec![
            prediction("a", "Alpha", &[]),
            prediction("b", "Beta", &[]),
            prediction("c", "Gamma", &[]),
        ];
        let options = NormalizeOptions::default().with_skip(|p| p.place_id == "b");
        let ids: Vec<_> = normalize_suggestions(&raw, &options)
            .into_iter()
            .filter_map(|s| s.place_id)
            .collect();

        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn label_function_is_applied() {
        let raw = vec![prediction("a", "400 Broadway, Seattle", &[(0, 3)])];
        let options = NormalizeOptions::default()
            .with_label(|p| p.description.split(',').next().unwrap_or_default().to_string());
        let normalized = normalize_suggestions(&raw, &options);

        assert_eq!(normalized[0].label, "400 Broadway");
    }

    #[test]
    fn prediction_without_ranges_has_no_match() {
        let raw = vec![prediction("a", "Alpha", &[])];
        let normalized = normalize_suggestions(&raw, &NormalizeOptions::default());
        assert!(normalized[0].matched_substrings.is_none());
    }
}
