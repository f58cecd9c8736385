// src/models/mod.rs

pub mod note;
pub mod quiz;
