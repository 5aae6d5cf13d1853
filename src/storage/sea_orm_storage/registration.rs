//! 注册与邮箱验证
//!
//! 验证流程（创建用户、加入课程或提交申请、作废令牌）在同一事务内完成，
//! 任何一步失败都整体回滚。

use super::users::insert_user;
use super::{SeaOrmStorage, db_err};
use crate::entity::courses::Entity as Courses;
use crate::entity::enrollment_requests::{
    ActiveModel as EnrollmentRequestActiveModel, STATUS_PENDING,
};
use crate::entity::enrollments::ActiveModel as EnrollmentActiveModel;
use crate::entity::verification_tokens::{
    ActiveModel as TokenActiveModel, Column as TokenColumn, Entity as VerificationTokens,
};
use crate::errors::{PeerReviewError, Result};
use crate::models::auth::entities::PendingRegistration;
use crate::models::courses::entities::EnrollmentOutcome;
use crate::models::users::{
    entities::{User, UserRole},
    requests::CreateUserRequest,
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use tracing::{info, warn};

impl SeaOrmStorage {
    /// 保存待验证的注册信息
    pub async fn create_verification_token_impl(&self, pending: PendingRegistration) -> Result<()> {
        TokenActiveModel {
            token: Set(pending.token),
            username: Set(pending.username),
            email: Set(pending.email),
            password_hash: Set(pending.password_hash),
            role: Set(pending.role.to_string()),
            display_name: Set(pending.display_name),
            course_id: Set(pending.course_id),
            expires_at: Set(pending.expires_at.timestamp()),
            used: Set(false),
            created_at: Set(chrono::Utc::now().timestamp()),
        }
        .insert(&self.db)
        .await
        .map_err(db_err("保存验证令牌失败"))?;

        Ok(())
    }

    /// 完成注册
    ///
    /// 领域错误（NotFound / InvalidState / Conflict）原样返回；
    /// 存储层错误统一包装为 TransactionFailure。
    pub async fn complete_registration_impl(
        &self,
        token: &str,
    ) -> Result<(User, EnrollmentOutcome)> {
        let txn = self.db.begin().await.map_err(db_err("开启事务失败"))?;

        match Self::complete_registration_in(&txn, token).await {
            Ok(outcome) => {
                txn.commit().await.map_err(|e| {
                    PeerReviewError::transaction_failure(format!("注册事务提交失败: {e}"))
                })?;
                info!("用户 {} 完成邮箱验证", outcome.0.username);
                Ok(outcome)
            }
            Err(e) => {
                // txn 在此处被丢弃，所有写入回滚
                if e.is_transient() {
                    Err(e)
                } else if e.is_store_failure() {
                    warn!("注册事务回滚: {}", e.format_simple());
                    Err(PeerReviewError::transaction_failure(e.message()))
                } else {
                    Err(e)
                }
            }
        }
    }

    async fn complete_registration_in(
        txn: &DatabaseTransaction,
        token: &str,
    ) -> Result<(User, EnrollmentOutcome)> {
        let now = chrono::Utc::now().timestamp();

        let pending = VerificationTokens::find_by_id(token.to_string())
            .one(txn)
            .await
            .map_err(db_err("查询验证令牌失败"))?
            .ok_or_else(|| PeerReviewError::not_found("Verification token not found"))?;

        if pending.used {
            return Err(PeerReviewError::invalid_state(
                "Verification token has already been used",
            ));
        }
        if pending.is_expired(now) {
            return Err(PeerReviewError::invalid_state(
                "Verification token has expired",
            ));
        }

        // 令牌行中的角色损坏时整体回滚，不静默降级
        let role = pending.role.parse::<UserRole>().map_err(|_| {
            PeerReviewError::database_operation(format!(
                "Verification token carries unknown role '{}'",
                pending.role
            ))
        })?;

        let user = insert_user(
            txn,
            CreateUserRequest {
                username: pending.username.clone(),
                email: pending.email.clone(),
                password: pending.password_hash.clone(),
                role,
                display_name: pending.display_name.clone(),
            },
        )
        .await?;

        let outcome = match pending.course_id {
            None => EnrollmentOutcome::NotRequested,
            Some(course_id) => {
                let course = Courses::find_by_id(course_id)
                    .one(txn)
                    .await
                    .map_err(db_err("查询课程失败"))?
                    .ok_or_else(|| {
                        PeerReviewError::not_found(format!("Course {course_id} not found"))
                    })?;

                if course.requires_approval {
                    EnrollmentRequestActiveModel {
                        course_id: Set(course_id),
                        user_id: Set(user.id),
                        status: Set(STATUS_PENDING.to_string()),
                        requested_at: Set(now),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await
                    .map_err(db_err("创建选课申请失败"))?;
                    EnrollmentOutcome::PendingApproval { course_id }
                } else {
                    EnrollmentActiveModel {
                        course_id: Set(course_id),
                        user_id: Set(user.id),
                        enrolled_at: Set(now),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await
                    .map_err(db_err("创建选课记录失败"))?;
                    EnrollmentOutcome::Enrolled { course_id }
                }
            }
        };

        // 条件更新作废令牌，并发重放只有一个能成功
        let consumed = VerificationTokens::update_many()
            .col_expr(TokenColumn::Used, Expr::value(true))
            .filter(TokenColumn::Token.eq(token))
            .filter(TokenColumn::Used.eq(false))
            .exec(txn)
            .await
            .map_err(db_err("作废验证令牌失败"))?
            .rows_affected;

        if consumed == 0 {
            return Err(PeerReviewError::invalid_state(
                "Verification token has already been used",
            ));
        }

        Ok((user, outcome))
    }
}

#[cfg(test)]
mod tests {
    use crate::models::auth::entities::PendingRegistration;
    use crate::models::courses::entities::EnrollmentOutcome;
    use crate::models::users::entities::UserRole;
    use crate::storage::test_support::{create_course, create_user, memory_storage};

    fn pending(token: &str, username: &str, course_id: Option<i64>) -> PendingRegistration {
        PendingRegistration {
            token: token.to_string(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: "hash".to_string(),
            role: UserRole::Student,
            display_name: None,
            course_id,
            expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
        }
    }

    #[tokio::test]
    async fn test_verification_enrolls_directly() {
        let storage = memory_storage().await;
        let instructor = create_user(&storage, "prof", UserRole::Instructor).await;
        let course = create_course(&storage, instructor.id, false).await;
        storage
            .create_verification_token(pending("tok-1", "dave", Some(course.id)))
            .await
            .unwrap();

        let (user, outcome) = storage.complete_registration("tok-1").await.unwrap();

        assert_eq!(user.username, "dave");
        assert_eq!(outcome, EnrollmentOutcome::Enrolled { course_id: course.id });
    }

    #[tokio::test]
    async fn test_verification_requests_approval() {
        let storage = memory_storage().await;
        let instructor = create_user(&storage, "prof", UserRole::Instructor).await;
        let course = create_course(&storage, instructor.id, true).await;
        storage
            .create_verification_token(pending("tok-2", "erin", Some(course.id)))
            .await
            .unwrap();

        let (_, outcome) = storage.complete_registration("tok-2").await.unwrap();

        assert_eq!(
            outcome,
            EnrollmentOutcome::PendingApproval { course_id: course.id }
        );
    }

    #[tokio::test]
    async fn test_token_cannot_be_replayed() {
        let storage = memory_storage().await;
        storage
            .create_verification_token(pending("tok-3", "frank", None))
            .await
            .unwrap();

        storage.complete_registration("tok-3").await.unwrap();
        let err = storage.complete_registration("tok-3").await.unwrap_err();

        assert_eq!(err.error_type(), "Invalid State");
        assert_eq!(storage.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failure_rolls_back_user_creation() {
        let storage = memory_storage().await;
        storage
            .create_verification_token(pending("tok-4", "grace", Some(9999)))
            .await
            .unwrap();

        let err = storage.complete_registration("tok-4").await.unwrap_err();

        assert_eq!(err.code(), "E006");
        assert!(storage.get_user_by_username("grace").await.unwrap().is_none());

        // 令牌未被消费，仍可识别为有效但课程不存在
        let again = storage.complete_registration("tok-4").await.unwrap_err();
        assert_eq!(again.code(), "E006");
    }

    #[tokio::test]
    async fn test_corrupt_role_rolls_back() {
        use crate::entity::verification_tokens::{Column, Entity as VerificationTokens};
        use crate::storage::test_support::memory_storage_impl;
        use sea_orm::sea_query::Expr;
        use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

        let storage = memory_storage_impl().await;
        storage
            .create_verification_token_impl(pending("tok-6", "ivan", None))
            .await
            .unwrap();
        VerificationTokens::update_many()
            .col_expr(Column::Role, Expr::value("superuser"))
            .filter(Column::Token.eq("tok-6"))
            .exec(&storage.db)
            .await
            .unwrap();

        let err = storage.complete_registration_impl("tok-6").await.unwrap_err();

        assert_eq!(err.error_type(), "Transaction Failure");
        assert!(storage.get_user_by_username_impl("ivan").await.unwrap().is_none());
        let token = VerificationTokens::find_by_id("tok-6".to_string())
            .one(&storage.db)
            .await
            .unwrap()
            .unwrap();
        assert!(!token.used);
    }

    #[tokio::test]
    async fn test_expired_and_unknown_tokens() {
        let storage = memory_storage().await;
        let mut expired = pending("tok-5", "heidi", None);
        expired.expires_at = chrono::Utc::now() - chrono::Duration::minutes(1);
        storage.create_verification_token(expired).await.unwrap();

        let err = storage.complete_registration("tok-5").await.unwrap_err();
        assert_eq!(err.error_type(), "Invalid State");

        let err = storage.complete_registration("nope").await.unwrap_err();
        assert_eq!(err.code(), "E006");
    }
}
