use axum::{
    extract::{Multipart, Path, State},
    http::{header::LOCATION, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{ImageError, ImageService, ImageUpload};

#[derive(Debug, Serialize)]
pub struct UploadImageResponse {
    pub success: bool,
    pub filename: String,
    pub message: &'static str,
}

/// POST /api/patients/upload-image - multipart `image` file, optional `filename` field
pub async fn upload_image(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult<UploadImageResponse> {
    let mut image: Option<ImageUpload> = None;
    let mut requested_name: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("image") => {
                let original_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await?.to_vec();
                image = Some(ImageUpload {
                    original_name,
                    requested_name: None,
                    content_type,
                    bytes,
                });
            }
            Some("filename") => requested_name = Some(field.text().await?),
            _ => {}
        }
    }

    let mut upload = image.ok_or(ImageError::MissingImage)?;
    upload.requested_name = requested_name;
    let name = upload.stored_name()?;

    let bucket = &state.config.managed.image_bucket;
    ImageService::new(&state.managed, bucket).upload(&name, upload).await?;

    Ok(ApiResponse::success(UploadImageResponse {
        success: true,
        filename: name,
        message: "Image uploaded successfully",
    }))
}

/// GET /api/patients/image/:filename - redirect to the image's public URL
pub async fn get_image(State(state): State<AppState>, Path(filename): Path<String>) -> Result<Response, ApiError> {
    let bucket = &state.config.managed.image_bucket;
    let url = ImageService::new(&state.managed, bucket).public_url(&filename)?;
    Ok((StatusCode::FOUND, [(LOCATION, url)]).into_response())
}

/// PUT /api/patients/update/:patient_id - patient rows are edited directly in the managed store
pub async fn update_patient(Path(_patient_id): Path<i64>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "message": "Patient records are updated directly through the managed store"
    })))
}

/// DELETE /api/patients/delete/:patient_id - see `update_patient`
pub async fn delete_patient(Path(_patient_id): Path<i64>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "message": "Patient records are deleted directly through the managed store"
    })))
}
