use serde::{Deserialize, Serialize};

/// Message content keyed by language code. All languages are optional; a
/// notification is considered empty only when none of them is present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalizedText {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub en: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ar: Option<String>,
}

impl LocalizedText {
    pub fn trilingual(
        fr: impl Into<String>,
        en: impl Into<String>,
        ar: impl Into<String>,
    ) -> Self {
        Self {
            fr: Some(fr.into()),
            en: Some(en.into()),
            ar: Some(ar.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fr.is_none() && self.en.is_none() && self.ar.is_none()
    }
}
