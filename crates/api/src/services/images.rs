//! Cloudinary client for product photos.
//!
//! Uploads and deletions are signed: the request parameters are sorted,
//! joined as `key=value` pairs, suffixed with the API secret and hashed with
//! SHA-256.

use chrono::Utc;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::CloudinaryConfig;
use crate::models::HostedImage;

/// Cloudinary API base URL.
const API_URL: &str = "https://api.cloudinary.com/v1_1";

/// Cloudinary delivery base URL.
const DELIVERY_URL: &str = "https://res.cloudinary.com";

/// Errors that can occur when talking to the image host.
#[derive(Debug, Error)]
pub enum ImageHostError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
    format: String,
    width: i32,
    height: i32,
}

impl From<UploadResponse> for HostedImage {
    fn from(r: UploadResponse) -> Self {
        Self {
            public_id: r.public_id,
            url: r.secure_url,
            format: r.format,
            width: r.width,
            height: r.height,
        }
    }
}

/// A file received from a client, ready for upload.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Cloudinary API client.
#[derive(Clone)]
pub struct CloudinaryClient {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: SecretString,
    folder: String,
}

impl CloudinaryClient {
    /// Create a new Cloudinary client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &CloudinaryConfig) -> Result<Self, ImageHostError> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            folder: config.folder.clone(),
        })
    }

    /// Upload an image into the configured folder.
    ///
    /// # Errors
    ///
    /// Returns error if the upload request fails or is rejected.
    pub async fn upload(&self, upload: ImageUpload) -> Result<HostedImage, ImageHostError> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign(
            &[("folder", &self.folder), ("timestamp", &timestamp)],
            self.api_secret.expose_secret(),
        );

        let file = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.content_type)?;
        let form = Form::new()
            .part("file", file)
            .text("api_key", self.api_key.clone())
            .text("folder", self.folder.clone())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let response = self
            .client
            .post(format!("{API_URL}/{}/image/upload", self.cloud_name))
            .multipart(form)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ImageHostError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let uploaded: UploadResponse = response.json().await?;
        tracing::info!(public_id = %uploaded.public_id, "Image uploaded");
        Ok(uploaded.into())
    }

    /// Delete an uploaded image.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or is rejected.
    pub async fn destroy(&self, public_id: &str) -> Result<(), ImageHostError> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign(
            &[("public_id", public_id), ("timestamp", &timestamp)],
            self.api_secret.expose_secret(),
        );

        let form = [
            ("public_id", public_id),
            ("timestamp", timestamp.as_str()),
            ("api_key", self.api_key.as_str()),
            ("signature", signature.as_str()),
            ("signature_algorithm", "sha256"),
        ];

        let response = self
            .client
            .post(format!("{API_URL}/{}/image/destroy", self.cloud_name))
            .form(&form)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ImageHostError::Api {
                status: status.as_u16(),
                message,
            });
        }

        tracing::info!(public_id = %public_id, "Image deleted");
        Ok(())
    }

    /// Delivery URL of an image scaled to `width` pixels.
    #[must_use]
    pub fn transformed_url(&self, image: &HostedImage, width: u32) -> String {
        transformed_url(&self.cloud_name, image, width)
    }
}

/// Sign request parameters.
///
/// Parameters are sorted by key; empty values are skipped.
fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut params: Vec<_> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    params.sort_by_key(|(k, _)| *k);

    let joined = params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    hex::encode(Sha256::digest(format!("{joined}{api_secret}").as_bytes()))
}

fn transformed_url(cloud_name: &str, image: &HostedImage, width: u32) -> String {
    format!(
        "{DELIVERY_URL}/{cloud_name}/image/upload/w_{width},c_scale/{}.{}",
        image.public_id, image.format
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_sorts_params() {
        let a = sign(&[("timestamp", "1"), ("folder", "f")], "secret");
        let b = sign(&[("folder", "f"), ("timestamp", "1")], "secret");
        assert_eq!(a, b);
        assert_eq!(a, hex::encode(Sha256::digest(b"folder=f&timestamp=1secret")));
    }

    #[test]
    fn test_sign_skips_empty_values() {
        let with_empty = sign(&[("folder", ""), ("timestamp", "1")], "s");
        let without = sign(&[("timestamp", "1")], "s");
        assert_eq!(with_empty, without);
    }

    #[test]
    fn test_transformed_url() {
        let image = HostedImage {
            public_id: "cyber-1/hoodie".to_string(),
            url: "https://res.cloudinary.com/demo/image/upload/v1/cyber-1/hoodie.jpg".to_string(),
            format: "jpg".to_string(),
            width: 1200,
            height: 800,
        };
        assert_eq!(
            transformed_url("demo", &image, 500),
            "https://res.cloudinary.com/demo/image/upload/w_500,c_scale/cyber-1/hoodie.jpg"
        );
    }
}
