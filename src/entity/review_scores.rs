//! 评分明细实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "review_scores")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub peer_review_id: i64,
    pub criterion_id: i64,
    #[sea_orm(column_type = "Double")]
    pub score: f64,
    #[sea_orm(column_type = "Text", nullable)]
    pub feedback: Option<String>,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::peer_reviews::Entity",
        from = "Column::PeerReviewId",
        to = "super::peer_reviews::Column::Id"
    )]
    PeerReview,
    #[sea_orm(
        belongs_to = "super::rubric_criteria::Entity",
        from = "Column::CriterionId",
        to = "super::rubric_criteria::Column::Id"
    )]
    Criterion,
}

impl Related<super::peer_reviews::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PeerReview.def()
    }
}

impl Related<super::rubric_criteria::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Criterion.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_review_score(self) -> crate::models::peer_reviews::entities::ReviewScore {
        crate::models::peer_reviews::entities::ReviewScore {
            id: self.id,
            peer_review_id: self.peer_review_id,
            criterion_id: self.criterion_id,
            score: self.score,
            feedback: self.feedback,
            updated_at: super::to_datetime(self.updated_at),
        }
    }
}
