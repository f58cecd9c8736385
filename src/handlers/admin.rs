// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        note::{Note, NoteRequest},
        quiz::{
            CreateQuizRequest, Quiz, QuizRecord, UNCATEGORIZED, UpdateQuizRequest, UploadQuery,
            non_blank,
        },
    },
    state::{SharedCatalog, SharedSessions},
};

/// Parses pasted or uploaded quiz content. Nothing is written when this fails.
fn parse_quiz(raw: &str) -> Result<QuizRecord, AppError> {
    Ok(serde_json::from_str(raw)?)
}

/// Department chosen in a form: `Uncategorized` means none.
fn chosen_department(value: Option<String>) -> Option<String> {
    non_blank(value).filter(|d| d != UNCATEGORIZED)
}

/// Applies an edit-form field: absent keeps `current`, blank clears it.
fn edited_field(current: Option<String>, submitted: Option<String>) -> Option<String> {
    match submitted {
        Some(value) => non_blank(Some(value)),
        None => current,
    }
}

/// Creates a quiz from pasted JSON.
/// Admin only.
pub async fn create_quiz(
    State(catalog): State<SharedCatalog>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let record = parse_quiz(&payload.quiz_json)?;

    let mut catalog = catalog.write().await;
    let title = non_blank(payload.title)
        .or_else(|| non_blank(record.quiz_title.clone()))
        .unwrap_or_else(|| format!("Quiz_{}", catalog.quiz_count() + 1));

    if catalog.quiz(&title).is_some() {
        return Err(AppError::Conflict(format!("Quiz '{}' already exists", title)));
    }

    let mut quiz = Quiz::from_record(title, record);
    if let Some(department) = chosen_department(payload.department) {
        quiz.department = Some(department);
    }
    if let Some(subcategory) = non_blank(payload.subcategory) {
        quiz.subcategory = Some(subcategory);
    }

    catalog.save_quiz(&quiz, None)?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "title": quiz.title })),
    ))
}

/// Creates a quiz from an uploaded JSON file sent as the raw request body.
/// Admin only.
pub async fn upload_quiz(
    State(catalog): State<SharedCatalog>,
    Query(query): Query<UploadQuery>,
    body: String,
) -> Result<impl IntoResponse, AppError> {
    let record = parse_quiz(&body)?;

    let mut catalog = catalog.write().await;
    let from_filename = non_blank(query.filename).map(|name| {
        name.strip_suffix(".json")
            .map(String::from)
            .unwrap_or(name)
    });
    let title = non_blank(record.quiz_title.clone())
        .or(from_filename)
        .unwrap_or_else(|| format!("Quiz_{}", catalog.quiz_count() + 1));

    if catalog.quiz(&title).is_some() {
        return Err(AppError::Conflict(format!("Quiz '{}' already exists", title)));
    }

    let mut quiz = Quiz::from_record(title, record);
    if quiz.department.is_none() {
        quiz.department = Some(UNCATEGORIZED.to_string());
    }

    catalog.save_quiz(&quiz, None)?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "title": quiz.title })),
    ))
}

/// Returns the stored record of a quiz for editing.
/// Admin only.
pub async fn get_quiz(
    State(catalog): State<SharedCatalog>,
    Path(title): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = catalog
        .read()
        .await
        .quiz(&title)
        .ok_or_else(|| AppError::NotFound(format!("Quiz '{}' not found", title)))?;
    Ok(Json(quiz.to_record()))
}

/// Replaces a quiz's content and metadata; a new title renames it.
/// Admin only.
pub async fn update_quiz(
    State(catalog): State<SharedCatalog>,
    State(sessions): State<SharedSessions>,
    Path(title): Path<String>,
    Json(payload): Json<UpdateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let record = parse_quiz(&payload.quiz_json)?;

    let mut catalog = catalog.write().await;
    if catalog.quiz(&title).is_none() {
        return Err(AppError::NotFound(format!("Quiz '{}' not found", title)));
    }

    let new_title = non_blank(payload.title).unwrap_or_else(|| title.clone());
    if new_title != title && catalog.quiz(&new_title).is_some() {
        return Err(AppError::Conflict(format!("Quiz '{}' already exists", new_title)));
    }

    let mut quiz = Quiz::from_record(new_title, record);
    quiz.department = match payload.department {
        Some(department) => chosen_department(Some(department)),
        None => quiz.department,
    };
    quiz.subcategory = edited_field(quiz.subcategory, payload.subcategory);

    catalog.save_quiz(&quiz, Some(&title))?;

    if quiz.title != title {
        let affected = sessions.write().await.clear_selection(&title);
        tracing::info!("Renamed quiz '{}' to '{}' ({} sessions reset)", title, quiz.title, affected);
    }

    Ok(Json(serde_json::json!({ "title": quiz.title })))
}

/// Deletes a quiz. Sessions that had it selected lose their attempt.
/// Admin only.
pub async fn delete_quiz(
    State(catalog): State<SharedCatalog>,
    State(sessions): State<SharedSessions>,
    Path(title): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    catalog.write().await.delete_quiz(&title)?;
    sessions.write().await.clear_selection(&title);
    Ok(StatusCode::NO_CONTENT)
}

/// Creates a keypoint note.
/// Admin only.
pub async fn create_note(
    State(catalog): State<SharedCatalog>,
    Json(payload): Json<NoteRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut catalog = catalog.write().await;
    let id = payload.title.trim().to_string();
    if catalog.note(&id).is_some() {
        return Err(AppError::Conflict(format!("Note '{}' already exists", id)));
    }

    let now = Utc::now();
    let note = Note {
        id: id.clone(),
        title: id,
        department: non_blank(payload.department),
        subcategory: non_blank(payload.subcategory),
        content: payload.content.trim().to_string(),
        created: Some(now),
        last_updated: Some(now),
    };
    catalog.save_note(&note, None)?;

    Ok((StatusCode::CREATED, Json(note)))
}

/// Edits a note, keeping its creation time. A new title renames it.
/// Admin only.
pub async fn update_note(
    State(catalog): State<SharedCatalog>,
    Path(id): Path<String>,
    Json(payload): Json<NoteRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut catalog = catalog.write().await;
    let created = catalog
        .note(&id)
        .ok_or_else(|| AppError::NotFound(format!("Note '{}' not found", id)))?
        .created;

    let new_id = payload.title.trim().to_string();
    if new_id != id && catalog.note(&new_id).is_some() {
        return Err(AppError::Conflict(format!("Note '{}' already exists", new_id)));
    }

    let note = Note {
        id: new_id.clone(),
        title: new_id,
        department: non_blank(payload.department),
        subcategory: non_blank(payload.subcategory),
        content: payload.content.trim().to_string(),
        created,
        last_updated: Some(Utc::now()),
    };
    catalog.save_note(&note, Some(&id))?;

    Ok(Json(note))
}

/// Deletes a note by id.
/// Admin only.
pub async fn delete_note(
    State(catalog): State<SharedCatalog>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    catalog.write().await.delete_note(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Files skipped during the last catalog load.
/// Admin only.
pub async fn list_warnings(
    State(catalog): State<SharedCatalog>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(catalog.read().await.warnings().to_vec()))
}
