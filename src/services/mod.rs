pub mod auth;
pub mod courses;
pub mod notifier;
pub mod ownership;
pub mod peer_reviews;
pub mod rubrics;

use std::sync::Arc;

use actix_web::{HttpRequest, web};

use crate::errors::{PeerReviewError, Result};
use crate::middlewares::RequireJWT;
use crate::models::users::entities::User;

pub use auth::AuthService;
pub use courses::CourseService;
pub use notifier::{LogNotifier, Notifier};
pub use ownership::{OwnedResource, OwnershipResolver};
pub use peer_reviews::PeerReviewService;
pub use rubrics::RubricService;

// 从 app data 中取出共享依赖（Storage / Notifier）
pub(crate) fn shared<T: ?Sized + 'static>(request: &HttpRequest) -> Arc<T> {
    request
        .app_data::<web::Data<Arc<T>>>()
        .unwrap_or_else(|| panic!("{} not found in app data", std::any::type_name::<T>()))
        .get_ref()
        .clone()
}

/// 当前登录用户，路由未挂 RequireJWT 时返回认证错误
pub(crate) fn current_user(request: &HttpRequest) -> Result<User> {
    RequireJWT::extract_user_claims(request)
        .ok_or_else(|| PeerReviewError::authentication("Authentication required"))
}
