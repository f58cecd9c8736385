// src/catalog.rs

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::models::{
    note::Note,
    quiz::{Quiz, QuizSummary, UNCATEGORIZED, non_blank},
};
use crate::storage::{FileStore, Loaded, Result, StorageError, sanitize_title};

/// In-memory index of every quiz and note in the store.
///
/// Writes go to disk first and then rebuild the index, so the index never
/// holds data the store does not. Each record remembers the stem of the file
/// it came from; a title and its file name need not agree.
pub struct Catalog {
    store: FileStore,
    quizzes: BTreeMap<String, Arc<Quiz>>,
    quiz_stems: BTreeMap<String, String>,
    notes: BTreeMap<String, Note>,
    note_stems: BTreeMap<String, String>,
    warnings: Vec<String>,
}

/// Where a save lands and which file it replaces.
#[derive(Debug, PartialEq)]
struct SavePlan {
    stem: String,
    retire: Option<String>,
}

/// Plans a write of `key`, optionally renamed from `previous`. `stems` maps
/// loaded keys to their file stems. The target stem must be free or already
/// belong to the record being saved; a file that exists on disk but was not
/// loaded also counts as taken.
fn plan_save(
    stems: &BTreeMap<String, String>,
    key: &str,
    previous: Option<&str>,
    on_disk: impl Fn(&str) -> bool,
) -> Result<SavePlan> {
    let source = previous.unwrap_or(key);
    let stem = sanitize_title(key);
    let owner = stems
        .iter()
        .find(|(_, existing)| **existing == stem)
        .map(|(k, _)| k.as_str());

    match owner {
        Some(owner) if owner != source => {
            return Err(StorageError::Collision {
                title: key.to_string(),
                existing: owner.to_string(),
            });
        }
        None if on_disk(&stem) => {
            return Err(StorageError::Collision {
                title: key.to_string(),
                existing: format!("{}.json", stem),
            });
        }
        _ => {}
    }

    let retire = stems.get(source).filter(|old| **old != stem).cloned();
    Ok(SavePlan { stem, retire })
}

impl Catalog {
    pub fn new(store: FileStore) -> Self {
        Self {
            store,
            quizzes: BTreeMap::new(),
            quiz_stems: BTreeMap::new(),
            notes: BTreeMap::new(),
            note_stems: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Rebuilds both indexes from disk. Files that cannot be read or parsed
    /// are skipped and reported in [`Catalog::warnings`].
    pub fn load(&mut self) -> Result<()> {
        self.quizzes.clear();
        self.quiz_stems.clear();
        self.notes.clear();
        self.note_stems.clear();
        self.warnings.clear();

        for entry in self.store.read_quizzes()? {
            match entry {
                Loaded::Record { stem, record } => {
                    let title =
                        non_blank(record.quiz_title.clone()).unwrap_or_else(|| stem.clone());
                    if let Some(first) = self.quiz_stems.get(&title) {
                        let w = format!(
                            "{}.json repeats the quiz title '{}' of {}.json; ignoring it",
                            stem, title, first
                        );
                        tracing::warn!("{}", w);
                        self.warnings.push(w);
                        continue;
                    }
                    self.quiz_stems.insert(title.clone(), stem);
                    self.quizzes
                        .insert(title.clone(), Arc::new(Quiz::from_record(title, record)));
                }
                Loaded::Warning(w) => {
                    tracing::warn!("Skipping quiz file. {}", w);
                    self.warnings.push(w);
                }
            }
        }

        for entry in self.store.read_notes()? {
            match entry {
                Loaded::Record { stem, mut record } => {
                    if record.id.is_empty() {
                        record.id = stem.clone();
                    }
                    if record.title.is_empty() {
                        record.title = record.id.clone();
                    }
                    if let Some(first) = self.note_stems.get(&record.id) {
                        let w = format!(
                            "{}.json repeats the note id '{}' of {}.json; ignoring it",
                            stem, record.id, first
                        );
                        tracing::warn!("{}", w);
                        self.warnings.push(w);
                        continue;
                    }
                    self.note_stems.insert(record.id.clone(), stem);
                    self.notes.insert(record.id.clone(), record);
                }
                Loaded::Warning(w) => {
                    tracing::warn!("Skipping note file. {}", w);
                    self.warnings.push(w);
                }
            }
        }

        tracing::info!(
            "Catalog loaded: {} quizzes, {} notes, {} warnings",
            self.quizzes.len(),
            self.notes.len(),
            self.warnings.len()
        );
        Ok(())
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    // ===== Quizzes =====

    pub fn quiz(&self, title: &str) -> Option<Arc<Quiz>> {
        self.quizzes.get(title).cloned()
    }

    pub fn quiz_count(&self) -> usize {
        self.quizzes.len()
    }

    /// Sorted distinct departments across all quizzes.
    pub fn departments(&self) -> Vec<String> {
        self.quizzes
            .values()
            .filter_map(|q| q.department.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Sorted distinct subcategories of quizzes whose department is in `depts`.
    pub fn subcategories(&self, depts: &[String]) -> Vec<String> {
        self.quizzes
            .values()
            .filter(|q| q.department.as_ref().is_some_and(|d| depts.contains(d)))
            .filter_map(|q| q.subcategory.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Quizzes in one of `depts` and, when `subcats` is non-empty, in one of
    /// `subcats`. Nothing is listed until at least one department is chosen.
    pub fn filter_quizzes(&self, depts: &[String], subcats: &[String]) -> Vec<QuizSummary> {
        let mut summaries: Vec<QuizSummary> = self
            .quizzes
            .values()
            .filter(|q| depts.iter().any(|d| d == q.department_or_default()))
            .filter(|q| {
                subcats.is_empty()
                    || q.subcategory.as_ref().is_some_and(|s| subcats.contains(s))
            })
            .map(|q| {
                let department = q.department_or_default().to_string();
                let label = match (&q.subcategory, department.as_str()) {
                    (Some(sub), _) => format!("{} ({})", q.title, sub),
                    (None, UNCATEGORIZED) => q.title.clone(),
                    (None, dept) => format!("{} ({})", q.title, dept),
                };
                QuizSummary {
                    title: q.title.clone(),
                    label,
                    department,
                    subcategory: q.subcategory.clone(),
                    question_count: q.questions.len(),
                }
            })
            .collect();
        summaries.sort_by(|a, b| a.label.cmp(&b.label));
        summaries
    }

    /// Persists `quiz` and reloads. When the quiz moves to a new file
    /// (a rename, or a hand-named file being rewritten), the new file is
    /// written before the old one is removed, so an interruption leaves a
    /// duplicate rather than losing the quiz.
    pub fn save_quiz(&mut self, quiz: &Quiz, previous_title: Option<&str>) -> Result<()> {
        let plan = plan_save(&self.quiz_stems, &quiz.title, previous_title, |stem| {
            self.store.quiz_exists(stem)
        })?;

        self.store.write_quiz(&plan.stem, &quiz.to_record())?;
        if let Some(old) = plan.retire {
            match self.store.remove_quiz(&old) {
                Ok(()) | Err(StorageError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        tracing::info!("Saved quiz '{}' to {}.json", quiz.title, plan.stem);
        self.load()
    }

    pub fn delete_quiz(&mut self, title: &str) -> Result<()> {
        let stem = self
            .quiz_stems
            .get(title)
            .ok_or_else(|| StorageError::NotFound(title.to_string()))?;
        self.store.remove_quiz(stem)?;
        self.quiz_stems.remove(title);
        self.quizzes.remove(title);
        tracing::info!("Deleted quiz '{}'", title);
        Ok(())
    }

    // ===== Notes =====

    pub fn note(&self, id: &str) -> Option<&Note> {
        self.notes.get(id)
    }

    /// Notes matching the department and subcategory selection; an empty
    /// selection matches everything. Sorted by title.
    pub fn filter_notes(&self, depts: &[String], subcats: &[String]) -> Vec<&Note> {
        let mut notes: Vec<&Note> = self
            .notes
            .values()
            .filter(|n| {
                depts.is_empty() || n.department.as_ref().is_some_and(|d| depts.contains(d))
            })
            .filter(|n| {
                subcats.is_empty() || n.subcategory.as_ref().is_some_and(|s| subcats.contains(s))
            })
            .collect();
        notes.sort_by(|a, b| a.title.cmp(&b.title));
        notes
    }

    /// Persists `note` and reloads, moving files like [`Catalog::save_quiz`].
    pub fn save_note(&mut self, note: &Note, previous_id: Option<&str>) -> Result<()> {
        let plan = plan_save(&self.note_stems, &note.id, previous_id, |stem| {
            self.store.note_exists(stem)
        })?;

        self.store.write_note(&plan.stem, note)?;
        if let Some(old) = plan.retire {
            match self.store.remove_note(&old) {
                Ok(()) | Err(StorageError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        tracing::info!("Saved note '{}' to {}.json", note.id, plan.stem);
        self.load()
    }

    pub fn delete_note(&mut self, id: &str) -> Result<()> {
        let stem = self
            .note_stems
            .get(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        self.store.remove_note(stem)?;
        self.note_stems.remove(id);
        self.notes.remove(id);
        tracing::info!("Deleted note '{}'", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quiz::Question;
    use std::fs;

    fn question(prompt: &str, options: &[&str], correct: &str) -> Question {
        Question {
            prompt: prompt.into(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct: correct.into(),
            explanation: None,
        }
    }

    fn quiz(title: &str, dept: Option<&str>, sub: Option<&str>) -> Quiz {
        Quiz {
            title: title.into(),
            department: dept.map(String::from),
            subcategory: sub.map(String::from),
            questions: vec![question("Q1", &["A", "B"], "A")],
        }
    }

    fn catalog() -> (tempfile::TempDir, Catalog) {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = Catalog::new(FileStore::open(dir.path()).unwrap());
        catalog.load().unwrap();
        (dir, catalog)
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let (dir, mut catalog) = catalog();
        let q = quiz("Vectors: intro", Some("Math"), None);
        catalog.save_quiz(&q, None).unwrap();

        let mut fresh = Catalog::new(FileStore::open(dir.path()).unwrap());
        fresh.load().unwrap();
        let loaded = fresh.quiz("Vectors: intro").unwrap();
        assert_eq!(loaded.questions, q.questions);
    }

    #[test]
    fn test_departments_and_subcategories() {
        let (_dir, mut catalog) = catalog();
        catalog.save_quiz(&quiz("A", Some("Math"), Some("Algebra")), None).unwrap();
        catalog.save_quiz(&quiz("B", Some("Math"), Some("Geometry")), None).unwrap();
        catalog.save_quiz(&quiz("C", Some("Biology"), Some("Cells")), None).unwrap();
        catalog.save_quiz(&quiz("D", None, Some("Loose")), None).unwrap();

        assert_eq!(catalog.departments(), strings(&["Biology", "Math"]));
        assert_eq!(
            catalog.subcategories(&strings(&["Math"])),
            strings(&["Algebra", "Geometry"])
        );
        assert!(catalog.subcategories(&[]).is_empty());
    }

    #[test]
    fn test_legacy_category_is_a_department() {
        let (dir, mut catalog) = catalog();
        fs::write(
            dir.path().join("quizzes").join("legacy.json"),
            r#"{"category":"History","questions":[]}"#,
        )
        .unwrap();
        catalog.load().unwrap();
        assert_eq!(catalog.departments(), strings(&["History"]));
        assert!(catalog.quiz("legacy").is_some());
    }

    #[test]
    fn test_filter_quizzes_labels_and_subcategory_filter() {
        let (_dir, mut catalog) = catalog();
        catalog.save_quiz(&quiz("Alg", Some("Math"), Some("Algebra")), None).unwrap();
        catalog.save_quiz(&quiz("Geo", Some("Math"), None), None).unwrap();
        catalog.save_quiz(&quiz("Misc", None, None), None).unwrap();

        let all = catalog.filter_quizzes(&strings(&["Math", UNCATEGORIZED]), &[]);
        let labels: Vec<&str> = all.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["Alg (Algebra)", "Geo (Math)", "Misc"]);

        let only_algebra = catalog.filter_quizzes(&strings(&["Math"]), &strings(&["Algebra"]));
        assert_eq!(only_algebra.len(), 1);
        assert_eq!(only_algebra[0].title, "Alg");

        assert!(catalog.filter_quizzes(&[], &[]).is_empty());
    }

    #[test]
    fn test_unreadable_files_are_warned_not_fatal() {
        let (dir, mut catalog) = catalog();
        catalog.save_quiz(&quiz("Good", Some("Math"), None), None).unwrap();
        fs::write(dir.path().join("quizzes").join("bad.json"), "nope").unwrap();
        catalog.load().unwrap();
        assert_eq!(catalog.quiz_count(), 1);
        assert_eq!(catalog.warnings().len(), 1);
    }

    #[test]
    fn test_rename_removes_old_file() {
        let (dir, mut catalog) = catalog();
        catalog.save_quiz(&quiz("Old name", Some("Math"), None), None).unwrap();
        catalog
            .save_quiz(&quiz("New name", Some("Math"), None), Some("Old name"))
            .unwrap();

        assert!(catalog.quiz("Old name").is_none());
        assert!(catalog.quiz("New name").is_some());
        assert!(!dir.path().join("quizzes").join("Old name.json").exists());
    }

    #[test]
    fn test_collision_is_rejected() {
        let (_dir, mut catalog) = catalog();
        catalog.save_quiz(&quiz("C++ basics", Some("CS"), None), None).unwrap();
        let err = catalog
            .save_quiz(&quiz("C## basics", Some("CS"), None), None)
            .unwrap_err();
        assert!(matches!(err, StorageError::Collision { .. }));
        assert_eq!(catalog.quiz("C++ basics").unwrap().department.as_deref(), Some("CS"));
        assert!(catalog.quiz("C## basics").is_none());
    }

    #[test]
    fn test_rename_onto_own_stem_is_allowed() {
        let (_dir, mut catalog) = catalog();
        catalog.save_quiz(&quiz("Q?", Some("CS"), None), None).unwrap();
        catalog.save_quiz(&quiz("Q!", Some("CS"), None), Some("Q?")).unwrap();
        assert!(catalog.quiz("Q!").is_some());
        assert!(catalog.quiz("Q?").is_none());
    }

    #[test]
    fn test_delete_missing_quiz_is_not_found() {
        let (_dir, mut catalog) = catalog();
        assert!(matches!(
            catalog.delete_quiz("ghost"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_notes_filter_and_delete() {
        let (_dir, mut catalog) = catalog();
        let note = |id: &str, dept: Option<&str>, sub: Option<&str>| Note {
            id: id.into(),
            title: id.into(),
            department: dept.map(String::from),
            subcategory: sub.map(String::from),
            content: "text".into(),
            created: None,
            last_updated: None,
        };
        catalog.save_note(&note("Zeta", Some("Math"), Some("Algebra")), None).unwrap();
        catalog.save_note(&note("Alpha", Some("Math"), None), None).unwrap();
        catalog.save_note(&note("Cells", Some("Biology"), None), None).unwrap();

        let all: Vec<&str> = catalog
            .filter_notes(&[], &[])
            .into_iter()
            .map(|n| n.title.as_str())
            .collect();
        assert_eq!(all, vec!["Alpha", "Cells", "Zeta"]);

        let math = catalog.filter_notes(&strings(&["Math"]), &[]);
        assert_eq!(math.len(), 2);

        let algebra = catalog.filter_notes(&strings(&["Math"]), &strings(&["Algebra"]));
        assert_eq!(algebra.len(), 1);
        assert_eq!(algebra[0].id, "Zeta");

        catalog.delete_note("Zeta").unwrap();
        assert!(catalog.note("Zeta").is_none());
        assert!(catalog.delete_note("Zeta").is_err());
    }

    fn write_raw(dir: &tempfile::TempDir, kind: &str, file: &str, body: &str) {
        fs::write(dir.path().join(kind).join(file), body).unwrap();
    }

    #[test]
    fn test_save_onto_hand_named_file_is_rejected() {
        let (dir, mut catalog) = catalog();
        write_raw(
            &dir,
            "quizzes",
            "legacy.json",
            r#"{"quiz_title":"World History","questions":[]}"#,
        );
        catalog.load().unwrap();

        let err = catalog.save_quiz(&quiz("legacy", None, None), None).unwrap_err();
        assert!(matches!(
            err,
            StorageError::Collision { ref existing, .. } if existing == "World History"
        ));
        assert!(catalog.quiz("World History").is_some());
        let on_disk = fs::read_to_string(dir.path().join("quizzes").join("legacy.json")).unwrap();
        assert!(on_disk.contains("World History"));
    }

    #[test]
    fn test_delete_removes_hand_named_file() {
        let (dir, mut catalog) = catalog();
        write_raw(
            &dir,
            "quizzes",
            "legacy.json",
            r#"{"quiz_title":"World History","questions":[]}"#,
        );
        catalog.load().unwrap();

        catalog.delete_quiz("World History").unwrap();
        assert!(catalog.quiz("World History").is_none());
        assert!(!dir.path().join("quizzes").join("legacy.json").exists());

        catalog.load().unwrap();
        assert_eq!(catalog.quiz_count(), 0);
    }

    #[test]
    fn test_rename_retires_hand_named_file() {
        let (dir, mut catalog) = catalog();
        write_raw(
            &dir,
            "quizzes",
            "legacy.json",
            r#"{"quiz_title":"World History","questions":[]}"#,
        );
        catalog.load().unwrap();

        catalog
            .save_quiz(&quiz("Modern History", None, None), Some("World History"))
            .unwrap();
        assert!(!dir.path().join("quizzes").join("legacy.json").exists());
        assert!(dir.path().join("quizzes").join("Modern History.json").exists());
        assert_eq!(catalog.quiz_count(), 1);
    }

    #[test]
    fn test_rewriting_in_place_moves_to_canonical_file() {
        let (dir, mut catalog) = catalog();
        write_raw(
            &dir,
            "quizzes",
            "legacy.json",
            r#"{"quiz_title":"World History","questions":[]}"#,
        );
        catalog.load().unwrap();

        catalog
            .save_quiz(&quiz("World History", Some("History"), None), None)
            .unwrap();
        assert!(!dir.path().join("quizzes").join("legacy.json").exists());
        assert_eq!(catalog.quiz_count(), 1);
        assert_eq!(
            catalog.quiz("World History").unwrap().department.as_deref(),
            Some("History")
        );
    }

    #[test]
    fn test_unloadable_file_still_blocks_its_name() {
        let (dir, mut catalog) = catalog();
        write_raw(&dir, "quizzes", "draft.json", "not json");
        catalog.load().unwrap();

        let err = catalog.save_quiz(&quiz("draft", None, None), None).unwrap_err();
        assert!(matches!(err, StorageError::Collision { .. }));
        let on_disk = fs::read_to_string(dir.path().join("quizzes").join("draft.json")).unwrap();
        assert_eq!(on_disk, "not json");
    }

    #[test]
    fn test_duplicate_titles_are_warned() {
        let (dir, mut catalog) = catalog();
        write_raw(&dir, "quizzes", "a.json", r#"{"quiz_title":"Same","questions":[]}"#);
        write_raw(&dir, "quizzes", "b.json", r#"{"quiz_title":"Same","questions":[]}"#);
        catalog.load().unwrap();

        assert_eq!(catalog.quiz_count(), 1);
        assert_eq!(catalog.warnings().len(), 1);
        assert!(catalog.warnings()[0].contains("b.json"));
    }

    #[test]
    fn test_notes_follow_their_file() {
        let (dir, mut catalog) = catalog();
        write_raw(
            &dir,
            "notes",
            "old-name.json",
            r#"{"id":"cells","title":"Cells","content":"text"}"#,
        );
        write_raw(
            &dir,
            "notes",
            "other.json",
            r#"{"id":"cells","title":"Copy","content":"text"}"#,
        );
        catalog.load().unwrap();
        assert_eq!(catalog.warnings().len(), 1);
        assert_eq!(catalog.note("cells").unwrap().title, "Cells");

        let squatter = Note {
            id: "old-name".into(),
            title: "Squatter".into(),
            department: None,
            subcategory: None,
            content: String::new(),
            created: None,
            last_updated: None,
        };
        assert!(matches!(
            catalog.save_note(&squatter, None),
            Err(StorageError::Collision { .. })
        ));

        catalog.delete_note("cells").unwrap();
        assert!(!dir.path().join("notes").join("old-name.json").exists());
    }
}
