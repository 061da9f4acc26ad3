use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Dialect keys the pronunciation service is known to return. The set is
/// open: any other key is looked up the same way.
pub const KNOWN_DIALECTS: [&str; 10] = [
    "e_written",
    "e_spoken",
    "n_written",
    "n_spoken",
    "sw_written",
    "sw_spoken",
    "t_written",
    "t_spoken",
    "w_written",
    "w_spoken",
];

const DEFAULT_DIALECT: &str = "e_written";

/// Opaque identifier selecting a regional/register transcription.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DialectKey(String);

impl DialectKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable name for the known keys. Presentation only.
    pub fn label(&self) -> Option<&'static str> {
        let label = match self.0.as_str() {
            "e_written" => "East Norwegian (written)",
            "e_spoken" => "East Norwegian (spoken)",
            "n_written" => "North Norwegian (written)",
            "n_spoken" => "North Norwegian (spoken)",
            "sw_written" => "Southwest Norwegian (written)",
            "sw_spoken" => "Southwest Norwegian (spoken)",
            "t_written" => "Trøndersk (written)",
            "t_spoken" => "Trøndersk (spoken)",
            "w_written" => "West Norwegian (written)",
            "w_spoken" => "West Norwegian (spoken)",
            "g2p" => "Generated guess",
            _ => return None,
        };
        Some(label)
    }

    pub fn known() -> impl Iterator<Item = DialectKey> {
        KNOWN_DIALECTS.into_iter().map(DialectKey::new)
    }
}

impl Default for DialectKey {
    fn default() -> Self {
        Self::new(DEFAULT_DIALECT)
    }
}

impl fmt::Display for DialectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DialectKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DialectKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One recorded usage of a word: a transcribed sentence and its audio clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub sentence: String,
    pub audio: String,
    pub dialect: String,
}

/// Payload of `GET /api/word/<word>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordRecord {
    pub word: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub ipa: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub examples: Vec<Example>,
}

/// An explicit `null` reads the same as a missing field.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl WordRecord {
    pub fn transcription(&self, dialect: &DialectKey) -> Option<&str> {
        self.ipa.get(dialect.as_str()).map(String::as_str)
    }
}
