use serde::{Deserialize, Deserializer, Serialize};

/// A JSON object as produced by the model or the drug lookup.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Canonical form of a free-text-or-list profile field.
///
/// Stored data and request bodies carry these fields either as a single
/// string or as a list of strings. Both shapes are folded into an ordered
/// list of trimmed, non-empty values as soon as they are read, so nothing
/// downstream has to branch on the original shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MedicalField(Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMedicalField {
    Text(String),
    List(Vec<String>),
}

impl MedicalField {
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Self::default()
        } else {
            Self(vec![trimmed.to_string()])
        }
    }

    pub fn from_items<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            items
                .into_iter()
                .map(|s| s.as_ref().trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }

    /// Parse the column representation: a JSON array, or any legacy plain string.
    pub fn from_stored(raw: &str) -> Self {
        match serde_json::from_str::<RawMedicalField>(raw) {
            Ok(RawMedicalField::List(items)) => Self::from_items(items),
            Ok(RawMedicalField::Text(text)) => Self::from_text(&text),
            Err(_) => Self::from_text(raw),
        }
    }

    pub fn to_stored(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }

    pub fn joined(&self) -> String {
        self.0.join(", ")
    }
}

impl<'de> Deserialize<'de> for MedicalField {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<RawMedicalField>::deserialize(deserializer)? {
            None => Self::default(),
            Some(RawMedicalField::Text(text)) => Self::from_text(&text),
            Some(RawMedicalField::List(items)) => Self::from_items(items),
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Med,
    Report,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Med => write!(f, "med"),
            Self::Report => write!(f, "report"),
        }
    }
}

impl std::str::FromStr for EntryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "med" | "medicine" => Ok(Self::Med),
            "report" => Ok(Self::Report),
            _ => Err(format!("Unknown history entry kind: {s}")),
        }
    }
}
