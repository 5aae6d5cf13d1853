//! 互评实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "peer_reviews")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub submission_id: i64,
    pub reviewer_id: i64,
    pub status: String,
    pub is_ai_generated: bool,
    pub is_released: bool,
    #[sea_orm(column_type = "Text", nullable)]
    pub overall_feedback: Option<String>,
    #[sea_orm(column_type = "Double", nullable)]
    pub total_score: Option<f64>,
    pub assigned_date: i64,
    pub completed_date: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::submissions::Entity",
        from = "Column::SubmissionId",
        to = "super::submissions::Column::Id"
    )]
    Submission,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::ReviewerId",
        to = "super::users::Column::Id"
    )]
    Reviewer,
    #[sea_orm(has_many = "super::review_scores::Entity")]
    ReviewScores,
}

impl Related<super::submissions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Submission.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reviewer.def()
    }
}

impl Related<super::review_scores::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReviewScores.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// 从数据库模型转换为业务模型
impl Model {
    pub fn review_status(&self) -> crate::models::peer_reviews::entities::ReviewStatus {
        use crate::models::peer_reviews::entities::ReviewStatus;

        self.status
            .parse::<ReviewStatus>()
            .unwrap_or(ReviewStatus::Assigned)
    }

    pub fn into_peer_review(self) -> crate::models::peer_reviews::entities::PeerReview {
        use crate::models::peer_reviews::entities::PeerReview;

        PeerReview {
            id: self.id,
            submission_id: self.submission_id,
            reviewer_id: self.reviewer_id,
            status: self.review_status(),
            is_ai_generated: self.is_ai_generated,
            is_released: self.is_released,
            overall_feedback: self.overall_feedback,
            total_score: self.total_score,
            assigned_date: super::to_datetime(self.assigned_date),
            completed_date: self.completed_date.map(super::to_datetime),
        }
    }
}
