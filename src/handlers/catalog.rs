// src/handlers/catalog.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{
    error::AppError,
    models::note::{Note, NoteView},
    state::SharedCatalog,
    utils::html::render_markdown,
};

/// Department/topic selection, each a comma-separated list.
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub departments: Option<String>,
    pub subcategories: Option<String>,
}

impl FilterQuery {
    pub fn departments(&self) -> Vec<String> {
        split_list(self.departments.as_deref())
    }

    pub fn subcategories(&self) -> Vec<String> {
        split_list(self.subcategories.as_deref())
    }
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn note_view(note: &Note) -> NoteView {
    NoteView {
        html: render_markdown(&note.content),
        note: note.clone(),
    }
}

/// Lists all departments, sorted.
pub async fn list_departments(
    State(catalog): State<SharedCatalog>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(catalog.read().await.departments()))
}

/// Lists the topics available in the selected departments.
pub async fn list_subcategories(
    State(catalog): State<SharedCatalog>,
    Query(filter): Query<FilterQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(catalog.read().await.subcategories(&filter.departments())))
}

/// Lists quizzes matching the department/topic selection.
pub async fn list_quizzes(
    State(catalog): State<SharedCatalog>,
    Query(filter): Query<FilterQuery>,
) -> Result<impl IntoResponse, AppError> {
    let catalog = catalog.read().await;
    Ok(Json(
        catalog.filter_quizzes(&filter.departments(), &filter.subcategories()),
    ))
}

/// Lists notes matching the selection, with markdown rendered to HTML.
pub async fn list_notes(
    State(catalog): State<SharedCatalog>,
    Query(filter): Query<FilterQuery>,
) -> Result<impl IntoResponse, AppError> {
    let catalog = catalog.read().await;
    let notes: Vec<NoteView> = catalog
        .filter_notes(&filter.departments(), &filter.subcategories())
        .into_iter()
        .map(note_view)
        .collect();
    Ok(Json(notes))
}

pub async fn get_note(
    State(catalog): State<SharedCatalog>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let catalog = catalog.read().await;
    let note = catalog
        .note(&id)
        .ok_or_else(|| AppError::NotFound(format!("Note '{}' not found", id)))?;
    Ok(Json(note_view(note)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(Some("Math, Biology,,")), vec!["Math", "Biology"]);
        assert!(split_list(None).is_empty());
        assert!(split_list(Some("")).is_empty());
    }
}
