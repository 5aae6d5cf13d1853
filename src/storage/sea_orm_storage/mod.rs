//! SeaORM 存储实现
//!
//! 统一的数据库存储层，支持 SQLite、PostgreSQL 和 MySQL。
//! 并发安全全部依赖数据库：唯一索引、条件更新与事务。

mod courses;
mod ownership;
mod peer_reviews;
mod registration;
mod review_scores;
mod rubrics;
mod users;

use crate::config::AppConfig;
use crate::errors::{PeerReviewError, Result};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr, SqlErr};
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// 未配置时的默认重试次数
const DEFAULT_MAX_RETRIES: u32 = 2;
/// 重试退避基数
const RETRY_BACKOFF_MS: u64 = 50;

/// SeaORM 存储实现
#[derive(Clone)]
pub struct SeaOrmStorage {
    pub(crate) db: DatabaseConnection,
    max_retries: u32,
}

impl SeaOrmStorage {
    /// 创建新的 SeaORM 存储实例
    pub async fn new_async() -> Result<Self> {
        let config = AppConfig::get();
        let db_url = Self::build_database_url(&config.database.url)?;

        // 根据数据库类型选择连接方式
        let db = if db_url.starts_with("sqlite://") {
            Self::connect_sqlite(&db_url, config).await?
        } else {
            Self::connect_generic(&db_url, config).await?
        };

        let mut storage = Self::from_connection(db).await?;
        storage.max_retries = config.database.max_retries;

        info!("SeaORM 存储初始化完成，数据库: {}", db_url);

        Ok(storage)
    }

    /// 基于已有连接创建存储并运行迁移
    pub async fn from_connection(db: DatabaseConnection) -> Result<Self> {
        Migrator::up(&db, None)
            .await
            .map_err(|e| PeerReviewError::database_operation(format!("数据库迁移失败: {e}")))?;

        Ok(Self {
            db,
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    /// SQLite 专用连接（WAL + pragma 优化）
    async fn connect_sqlite(url: &str, config: &AppConfig) -> Result<DatabaseConnection> {
        use sea_orm::SqlxSqliteConnector;
        use sea_orm::sqlx::sqlite::{
            SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
        };
        use std::str::FromStr;

        let opt = SqliteConnectOptions::from_str(url)
            .map_err(|e| PeerReviewError::database_config(format!("SQLite URL 解析失败: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .pragma("cache_size", "-64000")
            .pragma("temp_store", "memory")
            .pragma("wal_autocheckpoint", "1000");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.database.pool_size)
            .min_connections(1)
            .test_before_acquire(true)
            .acquire_timeout(Duration::from_secs(config.database.timeout))
            .idle_timeout(Duration::from_secs(300))
            .connect_with(opt)
            .await
            .map_err(|e| PeerReviewError::database_connection(format!("SQLite 连接失败: {e}")))?;

        Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
    }

    /// 通用连接（PostgreSQL、MySQL 等）
    async fn connect_generic(url: &str, config: &AppConfig) -> Result<DatabaseConnection> {
        let mut opt = ConnectOptions::new(url);
        opt.max_connections(config.database.pool_size)
            .min_connections(5)
            .connect_timeout(Duration::from_secs(config.database.timeout))
            .acquire_timeout(Duration::from_secs(config.database.timeout))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .sqlx_logging(false)
            .sqlx_logging_level(tracing::log::LevelFilter::Debug);

        Database::connect(opt)
            .await
            .map_err(|e| PeerReviewError::database_connection(format!("无法连接到数据库: {e}")))
    }

    /// 从 URL 自动推断数据库类型并构建连接 URL
    fn build_database_url(url: &str) -> Result<String> {
        if url.starts_with("sqlite:") {
            Ok(url.to_string())
        } else if url.ends_with(".db") || url.ends_with(".sqlite") {
            Ok(format!("sqlite://{url}?mode=rwc"))
        } else if url == ":memory:" {
            Ok("sqlite::memory:".to_string())
        } else if url.starts_with("postgres://")
            || url.starts_with("postgresql://")
            || url.starts_with("mysql://")
            || url.starts_with("mariadb://")
        {
            Ok(url.to_string())
        } else {
            Err(PeerReviewError::database_config(format!(
                "无法从 URL 推断数据库类型: {url}. 支持: sqlite://, postgres://, mysql://, 或 .db/.sqlite 文件路径"
            )))
        }
    }

    /// 瞬时连接错误在本地有限重试
    ///
    /// 所有写操作都由唯一索引或条件更新保护，重复执行不会产生重复数据。
    pub(crate) async fn with_retry<T, F, Fut>(&self, op_name: &str, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        "{} 遇到瞬时错误，第 {} 次重试: {}",
                        op_name,
                        attempt,
                        e.format_simple()
                    );
                    tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS * attempt as u64))
                        .await;
                }
                result => return result,
            }
        }
    }

    /// 只执行一次的写操作，瞬时错误时结果未知，记录后直接返回
    pub(crate) async fn at_most_once<T, Fut>(&self, op_name: &str, op: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let result = op.await;
        if let Err(e) = &result
            && e.is_transient()
        {
            warn!("{} 遇到瞬时错误，写入结果未知，不重试: {}", op_name, e.format_simple());
        }
        result
    }
}

/// 转换数据库错误，保留连接类错误以便重试
pub(crate) fn db_err(context: &'static str) -> impl Fn(DbErr) -> PeerReviewError {
    move |e| match PeerReviewError::from(e) {
        PeerReviewError::DatabaseConnection(msg) => {
            PeerReviewError::database_connection(format!("{context}: {msg}"))
        }
        other => PeerReviewError::database_operation(format!("{context}: {}", other.message())),
    }
}

/// 是否为唯一约束冲突
pub(crate) fn is_unique_violation(e: &DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

// Storage trait 实现
use crate::models::{
    auth::entities::PendingRegistration,
    courses::{
        entities::{Assignment, Course, EnrollmentOutcome, Submission},
        requests::{CreateAssignmentRequest, CreateCourseRequest},
    },
    peer_reviews::entities::{
        NewPeerReview, PeerReview, PeerReviewDetail, ReviewStatus, ValidatedScore,
    },
    rubrics::{entities::Rubric, requests::CreateRubricRequest},
    users::{entities::User, requests::CreateUserRequest},
};
use crate::storage::Storage;
use async_trait::async_trait;

#[async_trait]
impl Storage for SeaOrmStorage {
    // 用户模块
    async fn create_user(&self, user: CreateUserRequest) -> Result<User> {
        self.with_retry("create_user", || self.create_user_impl(user.clone()))
            .await
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        self.with_retry("get_user_by_id", || self.get_user_by_id_impl(id))
            .await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.with_retry("get_user_by_username", || {
            self.get_user_by_username_impl(username)
        })
        .await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.with_retry("get_user_by_email", || self.get_user_by_email_impl(email))
            .await
    }

    async fn get_user_by_username_or_email(&self, identifier: &str) -> Result<Option<User>> {
        self.with_retry("get_user_by_username_or_email", || {
            self.get_user_by_username_or_email_impl(identifier)
        })
        .await
    }

    async fn update_last_login(&self, id: i64) -> Result<bool> {
        self.with_retry("update_last_login", || self.update_last_login_impl(id))
            .await
    }

    async fn count_users(&self) -> Result<u64> {
        self.with_retry("count_users", || self.count_users_impl())
            .await
    }

    // 注册模块
    async fn create_verification_token(&self, pending: PendingRegistration) -> Result<()> {
        self.with_retry("create_verification_token", || {
            self.create_verification_token_impl(pending.clone())
        })
        .await
    }

    async fn complete_registration(&self, token: &str) -> Result<(User, EnrollmentOutcome)> {
        self.with_retry("complete_registration", || {
            self.complete_registration_impl(token)
        })
        .await
    }

    // 课程模块
    async fn create_course(&self, instructor_id: i64, req: CreateCourseRequest) -> Result<Course> {
        self.with_retry("create_course", || {
            self.create_course_impl(instructor_id, req.clone())
        })
        .await
    }

    async fn get_course_by_id(&self, course_id: i64) -> Result<Option<Course>> {
        self.with_retry("get_course_by_id", || self.get_course_by_id_impl(course_id))
            .await
    }

    async fn create_assignment(
        &self,
        course_id: i64,
        req: CreateAssignmentRequest,
    ) -> Result<Assignment> {
        self.with_retry("create_assignment", || {
            self.create_assignment_impl(course_id, req.clone())
        })
        .await
    }

    async fn get_assignment_by_id(&self, assignment_id: i64) -> Result<Option<Assignment>> {
        self.with_retry("get_assignment_by_id", || {
            self.get_assignment_by_id_impl(assignment_id)
        })
        .await
    }

    async fn bind_assignment_rubric(
        &self,
        assignment_id: i64,
        rubric_id: Option<i64>,
    ) -> Result<Assignment> {
        self.with_retry("bind_assignment_rubric", || {
            self.bind_assignment_rubric_impl(assignment_id, rubric_id)
        })
        .await
    }

    async fn create_submission(
        &self,
        assignment_id: i64,
        author_id: i64,
        content: String,
    ) -> Result<Submission> {
        self.with_retry("create_submission", || {
            self.create_submission_impl(assignment_id, author_id, content.clone())
        })
        .await
    }

    async fn get_submission_by_id(&self, submission_id: i64) -> Result<Option<Submission>> {
        self.with_retry("get_submission_by_id", || {
            self.get_submission_by_id_impl(submission_id)
        })
        .await
    }

    // 评分量规模块
    async fn create_rubric(&self, created_by: i64, req: CreateRubricRequest) -> Result<Rubric> {
        self.with_retry("create_rubric", || {
            self.create_rubric_impl(created_by, req.clone())
        })
        .await
    }

    async fn get_rubric_by_id(&self, rubric_id: i64) -> Result<Option<Rubric>> {
        self.with_retry("get_rubric_by_id", || self.get_rubric_by_id_impl(rubric_id))
            .await
    }

    // 归属链
    async fn resolve_instructor_for_review(&self, review_id: i64) -> Result<Option<i64>> {
        self.with_retry("resolve_instructor_for_review", || {
            self.resolve_instructor_for_review_impl(review_id)
        })
        .await
    }

    async fn resolve_instructor_for_assignment(&self, assignment_id: i64) -> Result<Option<i64>> {
        self.with_retry("resolve_instructor_for_assignment", || {
            self.resolve_instructor_for_assignment_impl(assignment_id)
        })
        .await
    }

    async fn resolve_instructor_for_submission(&self, submission_id: i64) -> Result<Option<i64>> {
        self.with_retry("resolve_instructor_for_submission", || {
            self.resolve_instructor_for_submission_impl(submission_id)
        })
        .await
    }

    // 互评模块
    async fn create_peer_review(&self, review: NewPeerReview) -> Result<PeerReview> {
        self.with_retry("create_peer_review", || {
            self.create_peer_review_impl(review.clone())
        })
        .await
    }

    async fn get_peer_review(&self, review_id: i64) -> Result<Option<PeerReviewDetail>> {
        self.with_retry("get_peer_review", || self.get_peer_review_impl(review_id))
            .await
    }

    async fn list_peer_reviews_for_assignment(
        &self,
        assignment_id: i64,
    ) -> Result<Vec<PeerReviewDetail>> {
        self.with_retry("list_peer_reviews_for_assignment", || {
            self.list_peer_reviews_for_assignment_impl(assignment_id)
        })
        .await
    }

    async fn delete_unfinished_peer_review(&self, review_id: i64) -> Result<bool> {
        self.with_retry("delete_unfinished_peer_review", || {
            self.delete_unfinished_peer_review_impl(review_id)
        })
        .await
    }

    async fn update_peer_review_status(
        &self,
        review_id: i64,
        status: ReviewStatus,
    ) -> Result<Option<PeerReview>> {
        self.with_retry("update_peer_review_status", || {
            self.update_peer_review_status_impl(review_id, status)
        })
        .await
    }

    async fn save_review_scores(
        &self,
        review_id: i64,
        rubric: &Rubric,
        scores: Vec<ValidatedScore>,
        overall_feedback: Option<String>,
    ) -> Result<PeerReviewDetail> {
        self.with_retry("save_review_scores", || {
            self.save_review_scores_impl(review_id, rubric, scores.clone(), overall_feedback.clone())
        })
        .await
    }

    async fn deposit_ai_review(
        &self,
        review: NewPeerReview,
        rubric: Option<&Rubric>,
        scores: Vec<ValidatedScore>,
    ) -> Result<PeerReviewDetail> {
        self.with_retry("deposit_ai_review", || {
            self.deposit_ai_review_impl(review.clone(), rubric, scores.clone())
        })
        .await
    }

    // 发布闸门
    async fn release_peer_review(&self, review_id: i64) -> Result<u64> {
        self.with_retry("release_peer_review", || {
            self.release_peer_review_impl(review_id)
        })
        .await
    }

    // 返回值必须是本次调用翻转的行数，提交后丢失确认时重试会得到 0，因此不重试
    async fn release_assignment_reviews(&self, assignment_id: i64) -> Result<u64> {
        self.at_most_once(
            "release_assignment_reviews",
            self.release_assignment_reviews_impl(assignment_id),
        )
        .await
    }

    async fn count_unreleased_reviews(&self, assignment_id: i64) -> Result<u64> {
        self.with_retry("count_unreleased_reviews", || {
            self.count_unreleased_reviews_impl(assignment_id)
        })
        .await
    }
}
