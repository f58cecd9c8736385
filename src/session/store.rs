// src/session/store.rs

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::attempt::Attempt;

/// Everything one visitor accumulates between requests.
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub admin: bool,
    pub selected_quiz: Option<String>,
    pub attempt: Attempt,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl Session {
    fn new(id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id,
            admin: false,
            selected_quiz: None,
            attempt: Attempt::default(),
            created_at: now,
            last_seen: now,
        }
    }

    /// Switching to a different quiz throws the current attempt away.
    pub fn select_quiz(&mut self, title: &str) {
        if self.selected_quiz.as_deref() != Some(title) {
            self.attempt.reset();
            self.selected_quiz = Some(title.to_string());
        }
    }

    pub fn clear_selection(&mut self) {
        self.attempt.reset();
        self.selected_quiz = None;
    }
}

pub const DEFAULT_IDLE_MINUTES: i64 = 12 * 60;

/// Sessions keyed by the token handed to the client. A session not seen for
/// `idle_ttl` is dropped.
#[derive(Debug)]
pub struct SessionStore {
    sessions: HashMap<Uuid, Session>,
    idle_ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_IDLE_MINUTES))
    }
}

impl SessionStore {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            idle_ttl,
        }
    }

    /// Opens a session, first dropping every idle one.
    pub fn create(&mut self, now: DateTime<Utc>) -> Uuid {
        self.prune(now);
        let id = Uuid::new_v4();
        self.sessions.insert(id, Session::new(id, now));
        tracing::debug!("Created session {}", id);
        id
    }

    /// Marks the session as seen at `now`. Returns `false` for unknown
    /// sessions and for idle ones, which are removed.
    pub fn touch(&mut self, id: &Uuid, now: DateTime<Utc>) -> bool {
        let Some(session) = self.sessions.get_mut(id) else {
            return false;
        };
        if now - session.last_seen < self.idle_ttl {
            session.last_seen = now;
            return true;
        }
        self.sessions.remove(id);
        tracing::debug!("Session {} expired", id);
        false
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        let ttl = self.idle_ttl;
        let before = self.sessions.len();
        self.sessions.retain(|_, session| now - session.last_seen < ttl);
        let pruned = before - self.sessions.len();
        if pruned > 0 {
            tracing::info!("Dropped {} idle sessions", pruned);
        }
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn get(&self, id: &Uuid) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut Session> {
        self.sessions.get_mut(id)
    }

    /// Deselects `title` in every session that has it selected.
    /// Returns how many sessions were affected.
    pub fn clear_selection(&mut self, title: &str) -> usize {
        let mut affected = 0;
        for session in self.sessions.values_mut() {
            if session.selected_quiz.as_deref() == Some(title) {
                session.clear_selection();
                affected += 1;
            }
        }
        affected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use crate::models::quiz::{Question, Quiz};
    use crate::session::attempt::Phase;

    fn sample_quiz(title: &str) -> Arc<Quiz> {
        Arc::new(Quiz {
            title: title.into(),
            department: None,
            subcategory: None,
            questions: vec![Question {
                prompt: "2+2?".into(),
                options: vec!["3".into(), "4".into(), "5".into()],
                correct: "4".into(),
                explanation: None,
            }],
        })
    }

    fn started_session(title: &str) -> Session {
        let now = Utc::now();
        let mut session = Session::new(Uuid::new_v4(), now);
        session.select_quiz(title);
        session
            .attempt
            .start(sample_quiz(title), None, now, &mut StdRng::seed_from_u64(7))
            .unwrap();
        session.attempt.answer(0, 1, now).unwrap();
        session
    }

    #[test]
    fn test_create_and_lookup() {
        let mut store = SessionStore::default();
        let id = store.create(Utc::now());
        assert!(store.contains(&id));
        assert!(!store.get(&id).unwrap().admin);
        assert!(!store.contains(&Uuid::new_v4()));
    }

    #[test]
    fn test_clear_selection_only_touches_matching_sessions() {
        let mut store = SessionStore::default();
        let a = store.create(Utc::now());
        let b = store.create(Utc::now());
        store.get_mut(&a).unwrap().select_quiz("Algebra");
        store.get_mut(&b).unwrap().select_quiz("Biology");

        assert_eq!(store.clear_selection("Algebra"), 1);
        assert!(store.get(&a).unwrap().selected_quiz.is_none());
        assert_eq!(store.get(&b).unwrap().selected_quiz.as_deref(), Some("Biology"));
    }

    #[test]
    fn test_reselecting_same_quiz_keeps_attempt() {
        let mut session = started_session("Algebra");
        session.select_quiz("Algebra");
        assert_eq!(session.attempt.phase(), Phase::InProgress);
        assert_eq!(session.attempt.answers().get(&0), Some(&1));
    }

    #[test]
    fn test_selecting_other_quiz_resets_attempt() {
        let mut session = started_session("Algebra");
        session.select_quiz("Biology");
        assert_eq!(session.selected_quiz.as_deref(), Some("Biology"));
        assert_eq!(session.attempt.phase(), Phase::NotStarted);
        assert!(session.attempt.answers().is_empty());
        assert!(session.attempt.display_order().is_empty());
        assert!(session.attempt.option_permutation().is_empty());
    }

    #[test]
    fn test_touch_keeps_active_session_alive() {
        let mut store = SessionStore::new(Duration::minutes(30));
        let start = Utc::now();
        let id = store.create(start);

        assert!(store.touch(&id, start + Duration::minutes(20)));
        assert!(store.touch(&id, start + Duration::minutes(40)));
        assert!(store.contains(&id));
    }

    #[test]
    fn test_idle_session_expires_on_touch() {
        let mut store = SessionStore::new(Duration::minutes(30));
        let start = Utc::now();
        let id = store.create(start);

        assert!(!store.touch(&id, start + Duration::minutes(30)));
        assert!(!store.contains(&id));
        assert!(!store.touch(&Uuid::new_v4(), start));
    }

    #[test]
    fn test_create_drops_idle_sessions() {
        let mut store = SessionStore::new(Duration::minutes(30));
        let start = Utc::now();
        let stale = store.create(start);
        let active = store.create(start);
        assert!(store.touch(&active, start + Duration::minutes(25)));

        let fresh = store.create(start + Duration::minutes(45));
        assert!(!store.contains(&stale));
        assert!(store.contains(&active));
        assert!(store.contains(&fresh));
    }
}
