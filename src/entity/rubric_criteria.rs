//! 评分维度实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "rubric_criteria")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub rubric_id: i64,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    #[sea_orm(column_type = "Double")]
    pub weight: f64,
    #[sea_orm(column_type = "Double")]
    pub max_points: f64,
    pub position: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::rubrics::Entity",
        from = "Column::RubricId",
        to = "super::rubrics::Column::Id"
    )]
    Rubric,
    #[sea_orm(has_many = "super::performance_levels::Entity")]
    PerformanceLevels,
    #[sea_orm(has_many = "super::review_scores::Entity")]
    ReviewScores,
}

impl Related<super::rubrics::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rubric.def()
    }
}

impl Related<super::performance_levels::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PerformanceLevels.def()
    }
}

impl Related<super::review_scores::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReviewScores.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_criterion(
        self,
        levels: Vec<crate::models::rubrics::entities::PerformanceLevel>,
    ) -> crate::models::rubrics::entities::Criterion {
        crate::models::rubrics::entities::Criterion {
            id: self.id,
            rubric_id: self.rubric_id,
            name: self.name,
            description: self.description,
            weight: self.weight,
            max_points: self.max_points,
            position: self.position,
            levels,
        }
    }
}
