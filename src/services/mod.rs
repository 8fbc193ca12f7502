// src/services/mod.rs

pub mod attempt;
pub mod gateway;
pub mod grader;
pub mod scoring;
pub mod session_lock;
pub mod sweeper;
