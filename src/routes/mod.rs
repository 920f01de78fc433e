mod auth;
mod health_check;
mod multipart;
mod response;
mod savings;

pub use auth::{login, logout, refresh, register, LoginRequest, LoginResponse, LogoutRequest, RefreshRequest};
pub use health_check::{health_check, ping};
pub use response::ApiResponse;
pub use savings::{create_saving, list_savings};
