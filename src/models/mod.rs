// src/models/mod.rs

pub mod attempt;
pub mod execution;
pub mod question;
pub mod submission;
pub mod user;
