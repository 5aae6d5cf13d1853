use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/course.ts")]
pub struct Course {
    pub id: i64,
    // 课程唯一归属教师
    pub instructor_id: i64,
    pub name: String,
    pub description: Option<String>,
    // 加入是否需要教师审批
    pub requires_approval: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/course.ts")]
pub struct Assignment {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<chrono::DateTime<chrono::Utc>>,
    pub rubric_id: Option<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/course.ts")]
pub struct Submission {
    pub id: i64,
    pub assignment_id: i64,
    pub author_id: i64,
    pub content: String,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

/// 邮箱验证后课程加入的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "status", rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/course.ts")]
pub enum EnrollmentOutcome {
    /// 注册时未指定课程
    NotRequested,
    /// 已直接加入课程
    Enrolled { course_id: i64 },
    /// 已提交加入申请，等待教师审批
    PendingApproval { course_id: i64 },
}
