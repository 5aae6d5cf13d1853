use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::config::Argon2Config;
use crate::errors::{PeerReviewError, Result};
use crate::models::{
    ApiResponse,
    auth::{RegisterRequest, entities::PendingRegistration, responses::RegisterResponse},
    users::entities::UserRole,
};
use crate::services::notifier::{Notifier, Recipient, TEMPLATE_VERIFY_EMAIL, notify_best_effort};
use crate::storage::Storage;
use crate::utils::password::hash_password_with;
use crate::utils::validate::{validate_email, validate_password, validate_username};

use super::AuthService;

/// 注册所需的配置片段
pub struct RegistrationSettings<'a> {
    pub argon2: &'a Argon2Config,
    pub token_ttl: chrono::Duration,
}

/// 登记注册请求并发送验证邮件
///
/// 此时不创建用户，只保存待验证记录；用户名或邮箱已被占用返回 `Conflict`。
/// 自助注册的账号一律为学生。
pub async fn register(
    storage: &Arc<dyn Storage>,
    notifier: &Arc<dyn Notifier>,
    settings: RegistrationSettings<'_>,
    req: RegisterRequest,
) -> Result<RegisterResponse> {
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_lowercase();

    validate_username(&username)?;
    validate_email(&email)?;
    validate_password(&req.password)?;

    if storage.get_user_by_username(&username).await?.is_some() {
        return Err(PeerReviewError::conflict("Username already exists"));
    }
    if storage.get_user_by_email(&email).await?.is_some() {
        return Err(PeerReviewError::conflict("Email already exists"));
    }
    if let Some(course_id) = req.course_id
        && storage.get_course_by_id(course_id).await?.is_none()
    {
        return Err(PeerReviewError::not_found(format!(
            "Course {course_id} not found"
        )));
    }

    let password_hash = hash_password_with(&req.password, settings.argon2)?;
    let token = uuid::Uuid::new_v4().to_string();
    let expires_at = chrono::Utc::now() + settings.token_ttl;

    storage
        .create_verification_token(PendingRegistration {
            token: token.clone(),
            username: username.clone(),
            email: email.clone(),
            password_hash,
            role: UserRole::Student,
            display_name: req.display_name,
            course_id: req.course_id,
            expires_at,
        })
        .await?;
    info!("Registration pending verification for {}", username);

    notify_best_effort(
        notifier.as_ref(),
        Recipient::Email(email.clone()),
        TEMPLATE_VERIFY_EMAIL,
        json!({
            "username": username,
            "token": token,
            "expires_at": expires_at,
        }),
    )
    .await;

    Ok(RegisterResponse { email, expires_at })
}

pub async fn handle_register(
    service: &AuthService,
    register_request: RegisterRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let notifier = service.get_notifier(request);
    let config = service.get_config();

    let settings = RegistrationSettings {
        argon2: &config.argon2,
        token_ttl: chrono::Duration::hours(config.registration.verification_token_ttl_hours),
    };
    let result = register(&storage, &notifier, settings, register_request).await;

    Ok(ApiResponse::respond_created(
        result,
        "Registration received, please verify your email",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::courses::entities::EnrollmentOutcome;
    use crate::services::notifier::recording::RecordingNotifier;
    use crate::storage::test_support::{create_course, create_user, memory_storage};
    use crate::utils::password::{test_params, verify_password};

    fn request(username: &str, course_id: Option<i64>) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: format!("{username}@uni.example"),
            password: "Correct1Horse".to_string(),
            display_name: None,
            course_id,
        }
    }

    fn settings(argon2: &Argon2Config) -> RegistrationSettings<'_> {
        RegistrationSettings {
            argon2,
            token_ttl: chrono::Duration::hours(1),
        }
    }

    #[tokio::test]
    async fn test_register_then_verify() {
        let storage = memory_storage().await;
        let recorder = Arc::new(RecordingNotifier::default());
        let notifier: Arc<dyn Notifier> = recorder.clone();
        let params = test_params();
        let prof = create_user(&storage, "prof", UserRole::Instructor).await;
        let course = create_course(&storage, prof.id, false).await;

        let resp = register(&storage, &notifier, settings(&params), request("dave_01", Some(course.id)))
            .await
            .unwrap();
        assert_eq!(resp.email, "dave_01@uni.example");
        // 验证前不创建用户
        assert!(storage.get_user_by_username("dave_01").await.unwrap().is_none());

        let sent = recorder.sent_with(TEMPLATE_VERIFY_EMAIL);
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].recipient,
            Recipient::Email("dave_01@uni.example".to_string())
        );
        let token = sent[0].data["token"].as_str().unwrap().to_string();

        let (user, outcome) = storage.complete_registration(&token).await.unwrap();
        assert_eq!(user.role, UserRole::Student);
        assert!(verify_password("Correct1Horse", &user.password_hash));
        assert_eq!(outcome, EnrollmentOutcome::Enrolled { course_id: course.id });
    }

    #[tokio::test]
    async fn test_taken_username_or_email_is_conflict() {
        let storage = memory_storage().await;
        let notifier: Arc<dyn Notifier> = Arc::new(RecordingNotifier::default());
        let params = test_params();
        create_user(&storage, "erin_01", UserRole::Student).await;

        let err = register(&storage, &notifier, settings(&params), request("erin_01", None))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), "Conflict");

        let mut same_email = request("erin_02", None);
        same_email.email = "erin_01@example.com".to_string();
        let err = register(&storage, &notifier, settings(&params), same_email)
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), "Conflict");
    }

    #[tokio::test]
    async fn test_policy_violations_are_validation_errors() {
        let storage = memory_storage().await;
        let notifier: Arc<dyn Notifier> = Arc::new(RecordingNotifier::default());
        let params = test_params();

        let mut weak = request("frank_01", None);
        weak.password = "short".to_string();
        let err = register(&storage, &notifier, settings(&params), weak)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E005");

        let err = register(&storage, &notifier, settings(&params), request("x", None))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E005");
    }

    #[tokio::test]
    async fn test_unknown_course_is_rejected_up_front() {
        let storage = memory_storage().await;
        let notifier: Arc<dyn Notifier> = Arc::new(RecordingNotifier::default());
        let params = test_params();

        let err = register(&storage, &notifier, settings(&params), request("grace_01", Some(77)))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E006");
    }
}
