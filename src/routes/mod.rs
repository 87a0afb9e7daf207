mod auth;
mod health_check;

pub use auth::{login, logout, profile, refresh, AuthResponse, LoginRequest, RefreshRequest};
pub use health_check::health_check;

use serde::Serialize;

/// Success envelope shared by every JSON endpoint
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}
