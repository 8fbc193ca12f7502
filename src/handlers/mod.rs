// src/handlers/mod.rs

use axum::{Json, http::StatusCode};
use serde::Serialize;

pub mod attempt;
pub mod auth;
pub mod execution;
pub mod question;
pub mod submission;
pub mod test;

/// Success envelope: `{ success: true, data, message? }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
        message: None,
    })
}

pub fn ok_with_message<T: Serialize>(data: T, message: &str) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
        message: Some(message.to_string()),
    })
}

pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, ok(data))
}
