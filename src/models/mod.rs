//! 业务数据模型
//!
//! 与 `entity` 中的数据库实体分离，供 service / route 层序列化使用。

pub mod auth;
pub mod common;
pub mod courses;
pub mod peer_reviews;
pub mod rubrics;
pub mod users;

pub use common::ApiResponse;

/// 程序启动时间
#[derive(Debug, Clone)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}

/// API 业务错误码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Success = 0,

    // 通用错误
    BadRequest = 1000,
    Unauthorized = 1001,
    Forbidden = 1003,
    NotFound = 1004,
    Conflict = 1009,
    RateLimitExceeded = 1029,

    // 互评
    PeerReviewSelfReview = 4001,
    PeerReviewDuplicate = 4002,
    PeerReviewInvalidState = 4003,
    PeerReviewInvalidStatus = 4004,
    ScoreOutOfRange = 4005,
    CriterionMismatch = 4006,
    ReviewAlreadyReleased = 4007,
    ReleaseNotApplicable = 4008,

    // 存储
    TransactionFailure = 5000,
}
