use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::ImageId;

const MAX_FILE_NAME_CHARS: usize = 255;
const MAX_FILE_PATH_CHARS: usize = 500;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ImageError {
    #[error("image file name cannot be empty")]
    EmptyFileName,

    #[error("image file name is longer than {MAX_FILE_NAME_CHARS} characters")]
    FileNameTooLong,

    #[error("image file path is longer than {MAX_FILE_PATH_CHARS} characters")]
    FilePathTooLong,
}

/// Catalog entry input. Files themselves are managed outside this service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDraft {
    pub file_name: String,
    pub file_path: Option<String>,
    pub description: Option<String>,
}

impl ImageDraft {
    /// # Errors
    ///
    /// Returns `ImageError` if the file name is blank or a field is too long.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidatedImage, ImageError> {
        let file_name = self.file_name.trim().to_owned();
        if file_name.is_empty() {
            return Err(ImageError::EmptyFileName);
        }
        if file_name.chars().count() > MAX_FILE_NAME_CHARS {
            return Err(ImageError::FileNameTooLong);
        }
        let file_path = self.file_path.filter(|p| !p.trim().is_empty());
        if file_path
            .as_deref()
            .is_some_and(|p| p.chars().count() > MAX_FILE_PATH_CHARS)
        {
            return Err(ImageError::FilePathTooLong);
        }

        Ok(ValidatedImage {
            file_name,
            file_path,
            description: self.description,
            created_at: now,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedImage {
    pub file_name: String,
    pub file_path: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ValidatedImage {
    #[must_use]
    pub fn assign_id(self, id: ImageId) -> Image {
        Image {
            id,
            file_name: self.file_name,
            file_path: self.file_path,
            description: self.description,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub id: ImageId,
    pub file_name: String,
    pub file_path: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Image {
    #[must_use]
    pub fn descriptor(&self) -> ImageDescriptor {
        ImageDescriptor {
            id: self.id,
            file_name: self.file_name.clone(),
            file_path: self.file_path.clone(),
        }
    }
}

/// What a client needs to locate and display an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub id: ImageId,
    pub file_name: String,
    pub file_path: Option<String>,
}
