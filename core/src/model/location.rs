use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse place triple derived from a title or a coordinate. Never stored.
///
/// Equality is field-wise, so two entries with every part absent compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApproximateLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl ApproximateLocation {
    pub fn country(country: impl Into<String>) -> Self {
        Self {
            country: Some(country.into()),
            ..Default::default()
        }
    }
}

impl fmt::Display for ApproximateLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = [&self.city, &self.state, &self.country]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .collect();
        f.write_str(&parts.join(", "))
    }
}
