// src/models/mod.rs

pub mod attempt;
pub mod progress;
pub mod quiz;
