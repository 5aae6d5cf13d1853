use serde::Serialize;
use ts_rs::TS;

use super::entities::{PeerReview, PeerReviewDetail, ReviewScore};

/// 非授权查看者看到的评审人名称
pub const ANONYMOUS_REVIEWER: &str = "Anonymous Reviewer";

// 评审人信息，匿名时 id 为空
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/peer_review.ts")]
pub struct ReviewerInfo {
    pub id: Option<i64>,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/peer_review.ts")]
pub struct PeerReviewResponse {
    #[serde(flatten)]
    pub review: PeerReview,
    pub reviewer: ReviewerInfo,
    pub scores: Vec<ReviewScore>,
}

impl PeerReviewResponse {
    /// `reveal_identity` 为 false 时抹去评审人身份
    pub fn from_detail(detail: PeerReviewDetail, reveal_identity: bool) -> Self {
        let reviewer = if reveal_identity {
            ReviewerInfo {
                id: Some(detail.review.reviewer_id),
                display_name: detail.reviewer_display_name,
            }
        } else {
            ReviewerInfo {
                id: None,
                display_name: ANONYMOUS_REVIEWER.to_string(),
            }
        };

        let mut review = detail.review;
        if !reveal_identity {
            // reviewer_id 同样属于身份信息
            review.reviewer_id = 0;
        }

        Self {
            review,
            reviewer,
            scores: detail.scores,
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/peer_review.ts")]
pub struct PeerReviewListResponse {
    pub assignment_id: i64,
    pub identities_revealed: bool,
    pub items: Vec<PeerReviewResponse>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/peer_review.ts")]
pub struct ReleaseCountResponse {
    pub assignment_id: i64,
    pub released_count: u64,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/peer_review.ts")]
pub struct UnreleasedCountResponse {
    pub assignment_id: i64,
    pub unreleased_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::peer_reviews::entities::ReviewStatus;

    fn detail() -> PeerReviewDetail {
        PeerReviewDetail {
            review: PeerReview {
                id: 10,
                submission_id: 3,
                reviewer_id: 42,
                status: ReviewStatus::Assigned,
                is_ai_generated: false,
                is_released: true,
                overall_feedback: None,
                total_score: None,
                assigned_date: chrono::Utc::now(),
                completed_date: None,
            },
            reviewer_display_name: "Bob".to_string(),
            submission_author_id: 7,
            scores: vec![],
        }
    }

    #[test]
    fn test_identity_revealed() {
        let resp = PeerReviewResponse::from_detail(detail(), true);
        assert_eq!(resp.reviewer.id, Some(42));
        assert_eq!(resp.reviewer.display_name, "Bob");
        assert_eq!(resp.review.reviewer_id, 42);
    }

    #[test]
    fn test_identity_redacted() {
        let resp = PeerReviewResponse::from_detail(detail(), false);
        assert_eq!(resp.reviewer.id, None);
        assert_eq!(resp.reviewer.display_name, ANONYMOUS_REVIEWER);
        assert_eq!(resp.review.reviewer_id, 0);

        let json = serde_json::to_value(&resp).unwrap();
        assert!(!json.to_string().contains("Bob"));
        assert_eq!(json["reviewer_id"], 0);
    }
}
