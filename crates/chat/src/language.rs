use serde::{Deserialize, Deserializer};

/// Language of the user-facing texts in a response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Language {
    /// English, used for anything not recognized.
    #[default]
    En,
    /// Romanian.
    Ro,
}

impl Language {
    /// Parse a language tag such as `ro` or `ro-RO`. Unknown tags fall back to English.
    pub fn from_tag(tag: &str) -> Self {
        let primary = tag.trim().split(['-', '_']).next().unwrap_or_default();

        if primary.eq_ignore_ascii_case("ro") {
            Self::Ro
        } else {
            Self::En
        }
    }
}

// Lenient: a missing, null or non-string language never makes a request malformed.
impl<'de> Deserialize<'de> for Language {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<serde_json::Value>::deserialize(deserializer)?;

        Ok(value
            .as_ref()
            .and_then(serde_json::Value::as_str)
            .map(Self::from_tag)
            .unwrap_or_default())
    }
}
