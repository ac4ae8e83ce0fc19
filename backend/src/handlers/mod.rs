// src/handlers/mod.rs

pub mod analytics;
pub mod attempt;
pub mod auth;
pub mod leaderboard;
pub mod quiz;
pub mod session;
