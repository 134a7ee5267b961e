//! Maps geocoder administrative-area labels onto the district vocabulary the
//! prediction model was trained on.

use std::collections::HashMap;
use std::sync::Arc;

/// Geocoder label → model district.
const BUILTIN_DISTRICTS: &[(&str, &str)] = &[
    ("Mysuru district", "Mysore"),
    ("Bangalore Urban", "Bengaluru Urban"),
    ("Bangalore Rural", "Bengaluru Rural"),
    ("Chennai district", "Chennai"),
    ("Thiruvananthapuram", "Thiruvananthapuram"),
    ("Trivandrum", "Thiruvananthapuram"),
    ("Tiruchirappalli", "Tiruchirappalli"),
    ("Trichy", "Tiruchirappalli"),
    ("Kolkata district", "Kolkata"),
    ("Mumbai Suburban", "Mumbai"),
    ("Ahmedabad district", "Ahmedabad"),
    ("Pune district", "Pune"),
];

/// Immutable lookup table; cheap to clone and share.
#[derive(Debug, Clone)]
pub struct DistrictNormalizer {
    table: Arc<HashMap<String, String>>,
}

impl DistrictNormalizer {
    pub fn new(table: HashMap<String, String>) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self::new(
            pairs
                .into_iter()
                .map(|(raw, canonical)| (raw.to_string(), canonical.to_string()))
                .collect(),
        )
    }

    pub fn builtin() -> Self {
        Self::from_pairs(BUILTIN_DISTRICTS.iter().copied())
    }

    /// Exact, case-sensitive lookup; unknown labels pass through unchanged.
    pub fn normalize(&self, raw_label: &str) -> String {
        match self.table.get(raw_label) {
            Some(canonical) => canonical.clone(),
            None => raw_label.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for DistrictNormalizer {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_entries_map() {
        let normalizer = DistrictNormalizer::builtin();
        for (raw, canonical) in BUILTIN_DISTRICTS {
            assert_eq!(normalizer.normalize(raw), *canonical);
        }
        assert_eq!(normalizer.len(), BUILTIN_DISTRICTS.len());
    }

    #[test]
    fn test_unknown_label_passes_through() {
        let normalizer = DistrictNormalizer::builtin();
        assert_eq!(normalizer.normalize("Dakshina Kannada"), "Dakshina Kannada");
        assert_eq!(normalizer.normalize(""), "");
    }

    #[test]
    fn test_lookup_is_case_sensitive_and_exact() {
        let normalizer = DistrictNormalizer::builtin();
        assert_eq!(normalizer.normalize("mysuru district"), "mysuru district");
        assert_eq!(normalizer.normalize("Mysuru"), "Mysuru");
        assert_eq!(normalizer.normalize("Mysuru district "), "Mysuru district ");
    }

    #[test]
    fn test_fixture_table_substitutes_builtin() {
        let normalizer = DistrictNormalizer::from_pairs([("Udupi district", "Udupi")]);
        assert_eq!(normalizer.normalize("Udupi district"), "Udupi");
        assert_eq!(normalizer.normalize("Mysuru district"), "Mysuru district");
    }

    #[test]
    fn test_empty_table_is_identity() {
        let normalizer = DistrictNormalizer::new(HashMap::new());
        assert!(normalizer.is_empty());
        assert_eq!(normalizer.normalize("Pune district"), "Pune district");
    }
}
