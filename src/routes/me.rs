use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::api::DataResponse;
use crate::auth::RequireAuth;
use crate::domain::auth::UserRole;

#[derive(Serialize)]
pub struct MeResponse {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

/// Get current authenticated user info
pub async fn get_me(auth: RequireAuth) -> Json<DataResponse<MeResponse>> {
    Json(DataResponse::new(MeResponse {
        user_id: auth.user_id,
        email: auth.email.clone(),
        role: auth.role,
    }))
}
