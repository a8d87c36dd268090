// src/handlers/mod.rs

pub mod health;
pub mod progress;
pub mod quiz;
pub mod results;
