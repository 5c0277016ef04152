//! Buffered multipart form reading for the upload endpoints.

use std::collections::HashMap;
use std::str::FromStr;

use axum::extract::Multipart;
use bytes::Bytes;

use crate::error::ApiError;

/// Name of the form field carrying the uploaded file.
pub const FILE_FIELD: &str = "file";

/// An uploaded file part.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-supplied file name.
    pub file_name: String,
    /// Content.
    pub bytes: Bytes,
}

/// A fully read multipart form: text fields plus at most one file.
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    file: Option<UploadedFile>,
}

impl UploadForm {
    /// Reads every part of `multipart`.
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidParams`] for malformed bodies or non-UTF-8 text
    /// fields.
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(ToString::to_string) else {
                continue;
            };
            if name == FILE_FIELD {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                form.file = Some(UploadedFile { file_name, bytes });
            } else {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    /// Parses a required text field.
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidParams`] if it is missing or does not parse.
    pub fn parse<T: FromStr>(&self, name: &str) -> Result<T, ApiError> {
        self.fields
            .get(name)
            .ok_or_else(|| ApiError::InvalidParams(format!("missing field `{name}`")))?
            .trim()
            .parse()
            .map_err(|_| ApiError::InvalidParams(format!("malformed field `{name}`")))
    }

    /// Takes the uploaded file.
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidParams`] if the form has no `file` part.
    pub fn take_file(&mut self) -> Result<UploadedFile, ApiError> {
        self.file
            .take()
            .ok_or_else(|| ApiError::InvalidParams(format!("missing field `{FILE_FIELD}`")))
    }
}
