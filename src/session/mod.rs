// src/session/mod.rs

pub mod attempt;
pub mod store;

pub use attempt::{Attempt, AttemptView, EndReason, Phase, ReviewItem, Score};
pub use store::{Session, SessionStore};
