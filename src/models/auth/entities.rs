use crate::models::users::entities::UserRole;

/// 待验证的注册信息，验证通过前不会创建用户
#[derive(Debug, Clone)]
pub struct PendingRegistration {
    pub token: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub display_name: Option<String>,
    pub course_id: Option<i64>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}
