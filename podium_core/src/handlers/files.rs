use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    error::{AppError, Result},
    files::{FileListQuery, StoredFile},
    middleware::session::CurrentUser,
    AppState,
};

pub async fn list_files(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<FileListQuery>,
) -> Result<Json<Vec<StoredFile>>> {
    // TODO: let admins list other users' files once roles are carried in the session claims.
    if let Some(owner) = query.requested_user() {
        current_user.authorize_owner(owner)?;
    }

    let files = state.file_store.list(&query).await.map_err(|e| match e {
        AppError::BadRequest(_) => e,
        other => AppError::operation("Failed to list files", other),
    })?;

    tracing::debug!(count = files.len(), user_id = ?query.requested_user(), "Listed files");

    Ok(Json(files))
}
