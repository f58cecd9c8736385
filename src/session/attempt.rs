// src/session/attempt.rs

//! One visitor's run through a quiz.
//!
//! Phases: `NotStarted -> InProgress -> Ended -> Reviewing`, with `restart`
//! leading back to `NotStarted` from either terminal phase. The reveal flag
//! is a display toggle available once the attempt has ended.
//!
//! Question order and option order are drawn once in [`Attempt::start`] and
//! stay fixed until the attempt is reset, so polling clients always see the
//! same layout.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::error::AppError;
use crate::models::quiz::{Question, Quiz};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Manual,
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    NotStarted,
    InProgress,
    Ended(EndReason),
    Reviewing(EndReason),
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::NotStarted => "not_started",
            Phase::InProgress => "in_progress",
            Phase::Ended(_) => "ended",
            Phase::Reviewing(_) => "reviewing",
        }
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        match self {
            Phase::Ended(r) | Phase::Reviewing(r) => Some(*r),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Score {
    pub correct: usize,
    pub total: usize,
}

#[derive(Debug, Default)]
pub struct Attempt {
    quiz: Option<Arc<Quiz>>,
    phase: Phase,
    /// Original indices of the valid questions, in display order.
    display_order: Vec<usize>,
    /// For each original question index, display slot -> original option index.
    option_permutation: Vec<Vec<usize>>,
    /// Display index -> chosen display option index.
    answers: BTreeMap<usize, usize>,
    /// Original indices of questions whose correct answer is not an option.
    skipped: Vec<usize>,
    started_at: Option<DateTime<Utc>>,
    time_limit_minutes: Option<u32>,
    expired: bool,
    revealing: bool,
    score: Option<Score>,
}

impl Attempt {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn score(&self) -> Option<Score> {
        self.score
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    pub fn is_revealing(&self) -> bool {
        self.revealing
    }

    pub fn answers(&self) -> &BTreeMap<usize, usize> {
        &self.answers
    }

    pub fn display_order(&self) -> &[usize] {
        &self.display_order
    }

    pub fn option_permutation(&self) -> &[Vec<usize>] {
        &self.option_permutation
    }

    pub fn skipped(&self) -> &[usize] {
        &self.skipped
    }

    /// Drops every attempt field and returns to `NotStarted`.
    pub fn reset(&mut self) {
        *self = Attempt::default();
    }

    /// Begins the attempt. Calling it again while in progress keeps the
    /// existing shuffles.
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        quiz: Arc<Quiz>,
        time_limit_minutes: Option<u32>,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<(), AppError> {
        match self.phase {
            Phase::InProgress => return Ok(()),
            Phase::Ended(_) | Phase::Reviewing(_) => {
                return Err(AppError::InvalidState(
                    "Attempt already finished; restart it first".to_string(),
                ));
            }
            Phase::NotStarted => {}
        }

        let (valid, skipped): (Vec<usize>, Vec<usize>) =
            (0..quiz.questions.len()).partition(|&i| quiz.questions[i].is_valid());
        for &i in &skipped {
            tracing::warn!(
                "Quiz '{}' question {} has a correct answer that is not among its options; skipping it",
                quiz.title,
                i + 1
            );
        }

        let mut display_order = valid;
        display_order.shuffle(rng);

        let option_permutation = quiz
            .questions
            .iter()
            .map(|q| {
                let mut perm: Vec<usize> = (0..q.options.len()).collect();
                perm.shuffle(rng);
                perm
            })
            .collect();

        *self = Attempt {
            quiz: Some(quiz),
            phase: Phase::InProgress,
            display_order,
            option_permutation,
            answers: BTreeMap::new(),
            skipped,
            started_at: Some(now),
            time_limit_minutes,
            expired: false,
            revealing: false,
            score: None,
        };
        Ok(())
    }

    /// Seconds left at `now`, floored at zero. `None` without a running timer.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> Option<i64> {
        if self.phase != Phase::InProgress {
            return None;
        }
        let limit = self.time_limit_minutes?;
        let started_at = self.started_at?;
        let elapsed = (now - started_at).num_seconds().max(0);
        Some((i64::from(limit) * 60 - elapsed).max(0))
    }

    /// Timer check for one polling cycle. Once no time remains the attempt is
    /// submitted with whatever answers it has and marked expired.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<i64> {
        let remaining = self.remaining_seconds(now)?;
        if remaining == 0 {
            self.expired = true;
            self.finish(EndReason::TimedOut);
            tracing::info!("Attempt timed out");
        }
        Some(remaining)
    }

    /// Records the chosen option for one displayed question, replacing any
    /// earlier choice.
    pub fn answer(
        &mut self,
        display_index: usize,
        option_index: usize,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.tick(now);
        if self.expired {
            return Err(AppError::InvalidState("Time is up".to_string()));
        }
        if self.phase != Phase::InProgress {
            return Err(AppError::InvalidState(
                "Answers can only be given while the attempt is in progress".to_string(),
            ));
        }

        let question = self.question_at(display_index).ok_or_else(|| {
            AppError::InvalidInput(format!("No question at position {}", display_index))
        })?;
        if option_index >= question.options.len() {
            return Err(AppError::InvalidInput(format!(
                "Question {} has no option {}",
                display_index, option_index
            )));
        }

        self.answers.insert(display_index, option_index);
        Ok(())
    }

    pub fn submit(&mut self) -> Result<Score, AppError> {
        if self.phase != Phase::InProgress {
            return Err(AppError::InvalidState(
                "Only an attempt in progress can be submitted".to_string(),
            ));
        }
        Ok(self.finish(EndReason::Manual))
    }

    /// Moves an ended attempt into review and returns the per-question entries.
    pub fn review(&mut self) -> Result<Vec<ReviewItem>, AppError> {
        match self.phase {
            Phase::Ended(r) => self.phase = Phase::Reviewing(r),
            Phase::Reviewing(_) => {}
            _ => {
                return Err(AppError::InvalidState(
                    "Nothing to review before the attempt ends".to_string(),
                ));
            }
        }
        Ok(self.review_items())
    }

    pub fn reveal_answers(&mut self) -> Result<(), AppError> {
        self.set_revealing(true)
    }

    pub fn hide_answers(&mut self) -> Result<(), AppError> {
        self.set_revealing(false)
    }

    fn set_revealing(&mut self, revealing: bool) -> Result<(), AppError> {
        match self.phase {
            Phase::Ended(_) | Phase::Reviewing(_) => {
                self.revealing = revealing;
                Ok(())
            }
            _ => Err(AppError::InvalidState(
                "Answers can only be revealed after the attempt ends".to_string(),
            )),
        }
    }

    pub fn restart(&mut self) -> Result<(), AppError> {
        match self.phase {
            Phase::Ended(_) | Phase::Reviewing(_) => {
                self.reset();
                Ok(())
            }
            _ => Err(AppError::InvalidState(
                "Only a finished attempt can be restarted".to_string(),
            )),
        }
    }

    /// Scores the current answers and ends the attempt.
    fn finish(&mut self, reason: EndReason) -> Score {
        let correct = (0..self.display_order.len())
            .filter(|&pos| self.is_correct(pos))
            .count();
        let score = Score {
            correct,
            total: self.display_order.len(),
        };
        self.score = Some(score);
        self.phase = Phase::Ended(reason);
        self.revealing = false;
        score
    }

    /// The chosen option, mapped back to its original position, must equal
    /// the question's `correct` string.
    fn is_correct(&self, display_index: usize) -> bool {
        let Some(question) = self.question_at(display_index) else {
            return false;
        };
        self.chosen_original_option(display_index)
            .and_then(|i| question.options.get(i))
            .is_some_and(|chosen| *chosen == question.correct)
    }

    fn chosen_original_option(&self, display_index: usize) -> Option<usize> {
        let chosen = *self.answers.get(&display_index)?;
        let original = *self.display_order.get(display_index)?;
        self.option_permutation.get(original)?.get(chosen).copied()
    }

    pub fn question_at(&self, display_index: usize) -> Option<&Question> {
        let quiz = self.quiz.as_ref()?;
        let original = *self.display_order.get(display_index)?;
        quiz.questions.get(original)
    }

    /// Options of a displayed question, in display order.
    pub fn displayed_options(&self, display_index: usize) -> Vec<&str> {
        let Some(question) = self.question_at(display_index) else {
            return Vec::new();
        };
        let original = self.display_order[display_index];
        self.option_permutation[original]
            .iter()
            .filter_map(|&i| question.options.get(i).map(String::as_str))
            .collect()
    }

    fn review_items(&self) -> Vec<ReviewItem> {
        (0..self.display_order.len())
            .filter_map(|pos| {
                let question = self.question_at(pos)?;
                let options: Vec<String> = self
                    .displayed_options(pos)
                    .into_iter()
                    .map(String::from)
                    .collect();
                let correct_option = if self.revealing {
                    options.iter().position(|o| *o == question.correct)
                } else {
                    None
                };
                Some(ReviewItem {
                    number: pos + 1,
                    prompt: question.prompt.clone(),
                    chosen: self.answers.get(&pos).copied(),
                    is_correct: self.is_correct(pos),
                    correct_option,
                    explanation: if self.revealing {
                        question.explanation.clone()
                    } else {
                        None
                    },
                    options,
                })
            })
            .collect()
    }

    /// Snapshot for clients. Call [`Attempt::tick`] first so the timer is current.
    pub fn view(&self, now: DateTime<Utc>) -> AttemptView {
        let questions = match self.phase {
            Phase::NotStarted => Vec::new(),
            _ => (0..self.display_order.len())
                .filter_map(|pos| {
                    let question = self.question_at(pos)?;
                    Some(QuestionView {
                        display_index: pos,
                        number: pos + 1,
                        prompt: question.prompt.clone(),
                        options: self
                            .displayed_options(pos)
                            .into_iter()
                            .map(String::from)
                            .collect(),
                        chosen: self.answers.get(&pos).copied(),
                    })
                })
                .collect(),
        };

        let skipped = self
            .quiz
            .as_ref()
            .map(|quiz| {
                self.skipped
                    .iter()
                    .filter_map(|&i| {
                        quiz.questions.get(i).map(|q| SkippedQuestion {
                            index: i,
                            prompt: q.prompt.clone(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        AttemptView {
            quiz_title: self.quiz.as_ref().map(|q| q.title.clone()),
            phase: self.phase.name(),
            end_reason: self.phase.end_reason(),
            started_at: self.started_at,
            time_limit_minutes: self.time_limit_minutes,
            remaining_seconds: self.remaining_seconds(now),
            expired: self.expired,
            revealing: self.revealing,
            score: self.score,
            answered: self.answers.len(),
            questions,
            skipped,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub display_index: usize,
    pub number: usize,
    pub prompt: String,
    pub options: Vec<String>,
    pub chosen: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SkippedQuestion {
    pub index: usize,
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct ReviewItem {
    pub number: usize,
    pub prompt: String,
    pub options: Vec<String>,
    pub chosen: Option<usize>,
    pub is_correct: bool,
    /// Display index of the right option; only while answers are revealed.
    pub correct_option: Option<usize>,
    pub explanation: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AttemptView {
    pub quiz_title: Option<String>,
    pub phase: &'static str,
    pub end_reason: Option<EndReason>,
    pub started_at: Option<DateTime<Utc>>,
    pub time_limit_minutes: Option<u32>,
    pub remaining_seconds: Option<i64>,
    pub expired: bool,
    pub revealing: bool,
    pub score: Option<Score>,
    pub answered: usize,
    pub questions: Vec<QuestionView>,
    pub skipped: Vec<SkippedQuestion>,
}
