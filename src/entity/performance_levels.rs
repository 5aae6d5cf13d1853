//! 表现等级实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "performance_levels")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub criterion_id: i64,
    #[sea_orm(column_type = "Double")]
    pub points: f64,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub position: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::rubric_criteria::Entity",
        from = "Column::CriterionId",
        to = "super::rubric_criteria::Column::Id"
    )]
    Criterion,
}

impl Related<super::rubric_criteria::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Criterion.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_level(self) -> crate::models::rubrics::entities::PerformanceLevel {
        crate::models::rubrics::entities::PerformanceLevel {
            id: self.id,
            criterion_id: self.criterion_id,
            points: self.points,
            description: self.description,
            position: self.position,
        }
    }
}
