use serde::Deserialize;
use ts_rs::TS;

// 分配评审人
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/peer_review.ts")]
pub struct AssignReviewRequest {
    pub submission_id: i64,
    pub reviewer_id: i64,
}

// 更新评审状态，status 保持字符串以便返回 InvalidStatus
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/peer_review.ts")]
pub struct SetReviewStatusRequest {
    pub status: String,
}

// 单个评分维度的打分
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/peer_review.ts")]
pub struct ScoreEntry {
    pub criterion_id: i64,
    pub score: f64,
    pub feedback: Option<String>,
}

// 记录评分
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/peer_review.ts")]
pub struct RecordScoresRequest {
    pub scores: Vec<ScoreEntry>,
    pub overall_feedback: Option<String>,
}

// AI 评审写入
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/peer_review.ts")]
pub struct DepositAiReviewRequest {
    pub overall_feedback: String,
    #[serde(default)]
    pub scores: Vec<ScoreEntry>,
}
