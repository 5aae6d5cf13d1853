use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::errors::{PeerReviewError, Result};
use crate::models::{
    ApiResponse,
    auth::{LoginRequest, responses::LoginResponse},
    users::entities::{User, UserStatus},
};
use crate::storage::Storage;
use crate::utils::jwt::JwtUtils;
use crate::utils::password::verify_password;

use super::AuthService;

/// 校验用户名/邮箱与密码
///
/// 用户不存在与密码错误返回同一条信息。
pub async fn authenticate(storage: &Arc<dyn Storage>, req: &LoginRequest) -> Result<User> {
    let invalid = || PeerReviewError::authentication("Username or password is incorrect");

    let user = storage
        .get_user_by_username_or_email(req.username.trim())
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&req.password, &user.password_hash) {
        return Err(invalid());
    }
    if user.status != UserStatus::Active {
        return Err(PeerReviewError::authentication("User is not active"));
    }

    if let Err(e) = storage.update_last_login(user.id).await {
        warn!("更新用户 {} 最后登录时间失败: {}", user.id, e.format_simple());
    }

    Ok(user)
}

pub async fn handle_login(
    service: &AuthService,
    login_request: LoginRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let config = service.get_config();

    let result = async {
        let user = authenticate(&storage, &login_request).await?;
        let access_token = JwtUtils::generate_access_token(user.id, &user.role.to_string())
            .map_err(|e| {
                error!("Failed to generate JWT token: {}", e);
                PeerReviewError::serialization("Unable to generate access token")
            })?;
        info!("User {} logged in successfully", user.username);

        Ok(LoginResponse {
            access_token,
            expires_in: config.jwt.access_token_expiry * 60,
            user,
        })
    }
    .await;

    Ok(ApiResponse::respond(result, "Login successful"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::{entities::UserRole, requests::CreateUserRequest};
    use crate::storage::test_support::memory_storage;
    use crate::utils::password::{hash_password_with, test_params};

    async fn storage_with_user() -> Arc<dyn Storage> {
        let storage = memory_storage().await;
        storage
            .create_user(CreateUserRequest {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password: hash_password_with("Correct1Horse", &test_params()).unwrap(),
                role: UserRole::Student,
                display_name: None,
            })
            .await
            .unwrap();
        storage
    }

    fn login(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_login_by_username_or_email() {
        let storage = storage_with_user().await;

        let user = authenticate(&storage, &login("alice", "Correct1Horse"))
            .await
            .unwrap();
        assert_eq!(user.username, "alice");

        let user = authenticate(&storage, &login("alice@example.com", "Correct1Horse"))
            .await
            .unwrap();
        assert_eq!(user.email, "alice@example.com");

        let stored = storage.get_user_by_id(user.id).await.unwrap().unwrap();
        assert!(stored.last_login.is_some());
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_look_the_same() {
        let storage = storage_with_user().await;

        let wrong = authenticate(&storage, &login("alice", "Wrong1Horse"))
            .await
            .unwrap_err();
        let unknown = authenticate(&storage, &login("mallory", "Correct1Horse"))
            .await
            .unwrap_err();

        assert_eq!(wrong, unknown);
        assert_eq!(wrong.error_type(), "Authentication Error");
    }
}
