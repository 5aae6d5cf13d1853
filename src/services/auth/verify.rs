use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::errors::{PeerReviewError, Result};
use crate::models::{
    ApiResponse,
    auth::{VerifyEmailRequest, responses::VerifyEmailResponse},
};
use crate::storage::Storage;

use super::AuthService;

/// 完成邮箱验证：创建用户并按课程设置加入课程或提交申请
pub async fn verify_email(
    storage: &Arc<dyn Storage>,
    req: VerifyEmailRequest,
) -> Result<VerifyEmailResponse> {
    let token = req.token.trim();
    if token.is_empty() {
        return Err(PeerReviewError::validation("Verification token is required"));
    }

    let (user, enrollment) = storage.complete_registration(token).await?;
    Ok(VerifyEmailResponse { user, enrollment })
}

pub async fn handle_verify_email(
    service: &AuthService,
    verify_request: VerifyEmailRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let result = verify_email(&storage, verify_request).await;
    Ok(ApiResponse::respond(result, "Email verified"))
}
