use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::errors::PeerReviewError;

// 互评状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/peer_review.ts")]
pub enum ReviewStatus {
    Assigned,
    InProgress,
    Completed,
}

impl ReviewStatus {
    pub const ASSIGNED: &'static str = "assigned";
    pub const IN_PROGRESS: &'static str = "in_progress";
    pub const COMPLETED: &'static str = "completed";

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Assigned => Self::ASSIGNED,
            ReviewStatus::InProgress => Self::IN_PROGRESS,
            ReviewStatus::Completed => Self::COMPLETED,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReviewStatus::Completed)
    }

    /// 状态迁移后的完成时间
    ///
    /// completed_date 只由状态推导：进入 completed 记录当前时间，
    /// 重复进入 completed 保留第一次的时间，离开 completed 清空。
    pub fn completed_date_after(
        current: ReviewStatus,
        current_completed_date: Option<i64>,
        next: ReviewStatus,
        now: i64,
    ) -> Option<i64> {
        match (current, next) {
            (ReviewStatus::Completed, ReviewStatus::Completed) => {
                current_completed_date.or(Some(now))
            }
            (_, ReviewStatus::Completed) => Some(now),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReviewStatus {
    type Err = PeerReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            Self::ASSIGNED => Ok(ReviewStatus::Assigned),
            Self::IN_PROGRESS => Ok(ReviewStatus::InProgress),
            Self::COMPLETED => Ok(ReviewStatus::Completed),
            _ => Err(PeerReviewError::invalid_status(format!(
                "Unknown review status '{s}', expected one of: assigned, in_progress, completed"
            ))),
        }
    }
}

// 互评记录
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/peer_review.ts")]
pub struct PeerReview {
    pub id: i64,
    pub submission_id: i64,
    pub reviewer_id: i64,
    pub status: ReviewStatus,
    pub is_ai_generated: bool,
    pub is_released: bool,
    pub overall_feedback: Option<String>,
    pub total_score: Option<f64>,
    pub assigned_date: chrono::DateTime<chrono::Utc>,
    pub completed_date: Option<chrono::DateTime<chrono::Utc>>,
}

impl PeerReview {
    /// 学生能否看到这条评审的内容
    pub fn is_visible_to_students(&self) -> bool {
        !self.is_ai_generated || self.is_released
    }
}

// 单个评分维度的得分
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/peer_review.ts")]
pub struct ReviewScore {
    pub id: i64,
    pub peer_review_id: i64,
    pub criterion_id: i64,
    pub score: f64,
    pub feedback: Option<String>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// 新建互评记录（存储层输入）
#[derive(Debug, Clone)]
pub struct NewPeerReview {
    pub submission_id: i64,
    pub reviewer_id: i64,
    pub status: ReviewStatus,
    pub is_ai_generated: bool,
    pub overall_feedback: Option<String>,
}

impl NewPeerReview {
    /// 人工分配：无需发布闸门
    pub fn human(submission_id: i64, reviewer_id: i64) -> Self {
        Self {
            submission_id,
            reviewer_id,
            status: ReviewStatus::Assigned,
            is_ai_generated: false,
            overall_feedback: None,
        }
    }

    /// AI 生成：直接完成，等待教师发布
    pub fn ai_generated(submission_id: i64, reviewer_id: i64, overall_feedback: String) -> Self {
        Self {
            submission_id,
            reviewer_id,
            status: ReviewStatus::Completed,
            is_ai_generated: true,
            overall_feedback: Some(overall_feedback),
        }
    }

    /// 人工评审创建即可见
    pub fn is_released(&self) -> bool {
        !self.is_ai_generated
    }
}

/// 带关联信息的互评记录（存储层查询结果）
#[derive(Debug, Clone)]
pub struct PeerReviewDetail {
    pub review: PeerReview,
    pub reviewer_display_name: String,
    pub submission_author_id: i64,
    pub scores: Vec<ReviewScore>,
}

/// 已校验的评分（存储层输入）
#[derive(Debug, Clone)]
pub struct ValidatedScore {
    pub criterion_id: i64,
    pub score: f64,
    pub feedback: Option<String>,
}
