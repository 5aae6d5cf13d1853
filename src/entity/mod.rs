//! SeaORM 实体定义
//!
//! 这些实体用于数据库操作，与 models 模块中的业务实体分离。
//! Storage 层使用这些实体进行 CRUD 操作，然后转换为 models 中的业务实体。

pub mod prelude;

pub mod assignments;
pub mod courses;
pub mod enrollment_requests;
pub mod enrollments;
pub mod peer_reviews;
pub mod performance_levels;
pub mod review_scores;
pub mod rubric_criteria;
pub mod rubrics;
pub mod submissions;
pub mod users;
pub mod verification_tokens;

use chrono::{DateTime, Utc};

// 数据库统一以秒级时间戳存储时间
pub(crate) fn to_datetime(ts: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(ts, 0).unwrap_or_default()
}
