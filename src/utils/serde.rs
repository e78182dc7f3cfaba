use serde::Deserialize;

/// Accepts the two historical request shapes for condition terms: a JSON
/// array of strings, or one plain string (commas are split downstream).
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(untagged)]
pub enum StringOrVec {
    #[default]
    None,
    Single(String),
    Multiple(Vec<String>),
}

impl StringOrVec {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::None => Vec::new(),
            Self::Single(value) => vec![value],
            Self::Multiple(values) => values,
        }
    }
}
