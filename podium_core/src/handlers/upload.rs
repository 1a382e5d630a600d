use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::{header, HeaderMap},
    Json,
};

use crate::{
    error::{AppError, Result},
    files::{FileType, FileUpload, StoredFile},
    middleware::session::CurrentUser,
    AppState,
};

const FILE_FIELD: &str = "file";
const FILE_TYPE_FIELD: &str = "fileType";
const SONG_ID_FIELD: &str = "songId";

pub async fn upload_file(
    State(state): State<AppState>,
    current_user: CurrentUser,
    headers: HeaderMap,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<StoredFile>> {
    if !is_multipart_form(&headers) {
        return Err(AppError::BadRequest(
            "Content-Type must be multipart/form-data".to_string(),
        ));
    }

    let mut multipart = multipart
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart request: {}", e)))?;

    let mut file_part: Option<(String, Option<String>, axum::body::Bytes)> = None;
    let mut file_type_tag: Option<String> = None;
    let mut song_id: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(format!("Failed to read multipart field: {}", e))
    })? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            FILE_FIELD => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read file data: {}", e))
                })?;
                file_part = Some((filename, content_type, data));
            }
            FILE_TYPE_FIELD => {
                file_type_tag = Some(read_text(field).await?);
            }
            SONG_ID_FIELD => {
                song_id = Some(read_text(field).await?).filter(|id| !id.trim().is_empty());
            }
            _ => {}
        }
    }

    let (original_name, content_type, data) =
        file_part.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;

    let upload = FileUpload {
        original_name,
        content_type,
        data,
        file_type: FileType::from_tag(file_type_tag.as_deref()),
        user_id: current_user.uid().map(str::to_string),
        song_id,
    };

    let stored = state.file_store.store(upload).await.map_err(|e| match e {
        AppError::BadRequest(_) => e,
        other => AppError::operation("Failed to upload file", other),
    })?;

    Ok(Json(stored))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read form field: {}", e)))
}

fn is_multipart_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<mime::Mime>().ok())
        .is_some_and(|mime_type| {
            mime_type.type_() == mime::MULTIPART && mime_type.subtype() == mime::FORM_DATA
        })
}
