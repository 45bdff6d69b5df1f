use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

pub const TITLE_KEY: &str = "title";
pub const MESSAGE_KEY: &str = "message";

/// String extras the OS hands back verbatim when an activation fires.
pub type Extras = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
}

impl NotificationPayload {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn to_extras(&self) -> Extras {
        let mut extras = Extras::new();
        extras.insert(TITLE_KEY.to_owned(), self.title.clone());
        extras.insert(MESSAGE_KEY.to_owned(), self.body.clone());
        extras
    }

    /// Both keys must be present; empty strings are accepted.
    pub fn from_extras(extras: &Extras) -> Result<Self, EngineError> {
        let title = extras
            .get(TITLE_KEY)
            .ok_or_else(|| EngineError::MalformedPayload(format!("missing `{TITLE_KEY}`")))?;
        let body = extras
            .get(MESSAGE_KEY)
            .ok_or_else(|| EngineError::MalformedPayload(format!("missing `{MESSAGE_KEY}`")))?;
        Ok(Self::new(title.clone(), body.clone()))
    }
}

/// Encodes extras as the opaque JSON blob used when an activation crosses a
/// process boundary.
pub fn encode_extras(extras: &Extras) -> String {
    // A map of strings always serialises.
    serde_json::to_string(extras).unwrap_or_default()
}

pub fn decode_extras(raw: &str) -> Result<Extras, EngineError> {
    serde_json::from_str(raw).map_err(|err| EngineError::MalformedPayload(err.to_string()))
}
