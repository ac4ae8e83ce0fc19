// src/models/mod.rs

pub mod analytics;
pub mod attempt;
pub mod leaderboard;
pub mod quiz;
pub mod user;
