use std::convert::TryFrom;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

pub type PhotoId = i32;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Photo {
    pub id: PhotoId,
    pub source: String,
    pub caption: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<crate::db::photos::Photo> for Photo {
    fn from(p: crate::db::photos::Photo) -> Self {
        Photo {
            id: p.id,
            source: p.source,
            caption: p.caption,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("source must not be empty")]
    EmptySource,
}

/// The caller-supplied part of a photo, checked before it reaches a store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPhoto {
    source: String,
    caption: String,
}

impl NewPhoto {
    /// Only the source is checked. Both values are otherwise kept exactly as submitted.
    pub fn new(source: String, caption: String) -> Result<Self, ValidationError> {
        if source.trim().is_empty() {
            return Err(ValidationError::EmptySource);
        }

        Ok(NewPhoto { source, caption })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }
}

impl TryFrom<photogram_api_structs::PhotoPayload> for NewPhoto {
    type Error = ValidationError;

    fn try_from(payload: photogram_api_structs::PhotoPayload) -> Result<Self, Self::Error> {
        NewPhoto::new(payload.source, payload.caption)
    }
}
