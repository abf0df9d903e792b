//! Product image handlers.
//!
//! Uploads go straight to the image host; only the hosted image's metadata
//! is stored. Deleting an image removes the hosted file too.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use cyber_shop_core::{ProductId, ProductImageId};

use crate::access::{List, Operation};
use crate::db::ProductImageRepository;
use crate::error::{AppError, Result};
use crate::middleware::OptionalSession;
use crate::models::ProductImage;
use crate::routes::{authorize, nullable};
use crate::services::images::ImageUpload;
use crate::state::AppState;

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Width of the thumbnail URL returned with every image.
const THUMBNAIL_WIDTH: u32 = 300;

/// Image update request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateImageRequest {
    pub alt_text: Option<String>,
    /// `null` detaches the image from its product.
    #[serde(default, deserialize_with = "nullable")]
    pub product_id: Option<Option<ProductId>>,
}

/// An image with a resized delivery URL.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    #[serde(flatten)]
    pub image: ProductImage,
    pub thumbnail_url: String,
}

impl ImageResponse {
    fn new(state: &AppState, image: ProductImage) -> Self {
        let thumbnail_url = state
            .images()
            .transformed_url(&image.image, THUMBNAIL_WIDTH);
        Self {
            image,
            thumbnail_url,
        }
    }
}

/// List all images. Images are public.
pub async fn index(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
) -> Result<Json<Vec<ImageResponse>>> {
    authorize(List::ProductImage, Operation::Read, session.as_ref())?;
    let images = ProductImageRepository::new(state.pool()).list().await?;
    Ok(Json(
        images
            .into_iter()
            .map(|image| ImageResponse::new(&state, image))
            .collect(),
    ))
}

/// Upload an image.
///
/// Multipart fields: `file` (required), `altText`, `productId`.
pub async fn upload(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    authorize(List::ProductImage, Operation::Create, session.as_ref())?;

    let mut file = None;
    let mut alt_text = String::new();
    let mut product_id = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_owned();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_owned();
                if !content_type.starts_with("image/") {
                    return Err(AppError::BadRequest(format!(
                        "expected an image, got {content_type}"
                    )));
                }
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                file = Some(ImageUpload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            Some("altText") => alt_text = field.text().await.map_err(bad_multipart)?,
            Some("productId") => {
                let raw = field.text().await.map_err(bad_multipart)?;
                let id = raw
                    .trim()
                    .parse::<i32>()
                    .map_err(|_| AppError::BadRequest(format!("invalid productId: {raw}")))?;
                product_id = Some(ProductId::new(id));
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| AppError::BadRequest("missing file field".to_string()))?;
    let hosted = state.images().upload(file).await?;

    let saved = ProductImageRepository::new(state.pool())
        .create(&hosted, &alt_text, product_id)
        .await;
    let image = match saved {
        Ok(image) => image,
        Err(e) => {
            // Don't leave an orphan on the image host
            if let Err(cleanup) = state.images().destroy(&hosted.public_id).await {
                tracing::warn!(public_id = %hosted.public_id, error = %cleanup, "Failed to remove orphaned upload");
            }
            return Err(e.into());
        }
    };

    Ok((StatusCode::CREATED, Json(ImageResponse::new(&state, image))))
}

/// Get one image.
pub async fn show(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    Path(id): Path<ProductImageId>,
) -> Result<Json<ImageResponse>> {
    authorize(List::ProductImage, Operation::Read, session.as_ref())?;
    let image = ProductImageRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("image {id}")))?;
    Ok(Json(ImageResponse::new(&state, image)))
}

/// Change an image's alt text or product.
pub async fn update(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    Path(id): Path<ProductImageId>,
    Json(body): Json<UpdateImageRequest>,
) -> Result<Json<ImageResponse>> {
    authorize(List::ProductImage, Operation::Update, session.as_ref())?;
    let image = ProductImageRepository::new(state.pool())
        .update(id, body.alt_text, body.product_id)
        .await?;
    Ok(Json(ImageResponse::new(&state, image)))
}

/// Delete an image and its hosted file.
pub async fn destroy(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    Path(id): Path<ProductImageId>,
) -> Result<StatusCode> {
    authorize(List::ProductImage, Operation::Delete, session.as_ref())?;
    let image = ProductImageRepository::new(state.pool())
        .delete(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("image {id}")))?;

    // The record is gone either way; a failed remote delete only leaks storage
    if let Err(e) = state.images().destroy(&image.image.public_id).await {
        tracing::warn!(image_id = %id, error = %e, "Failed to delete hosted image");
    }

    Ok(StatusCode::NO_CONTENT)
}

fn bad_multipart(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadRequest(err.body_text())
}
