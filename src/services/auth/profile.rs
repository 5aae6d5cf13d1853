use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use crate::models::{ApiResponse, auth::responses::UserInfoResponse};
use crate::services::current_user;

use super::AuthService;

pub async fn handle_get_user(
    _service: &AuthService,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let result = current_user(request).map(|user| UserInfoResponse { user });
    Ok(ApiResponse::respond(
        result,
        "User information retrieved successfully",
    ))
}
