//! 评分量规实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "rubrics")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub title: String,
    pub created_by: i64,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::CreatedBy",
        to = "super::users::Column::Id"
    )]
    Creator,
    #[sea_orm(has_many = "super::rubric_criteria::Entity")]
    Criteria,
    #[sea_orm(has_many = "super::assignments::Entity")]
    Assignments,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Creator.def()
    }
}

impl Related<super::rubric_criteria::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Criteria.def()
    }
}

impl Related<super::assignments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// 组装完整量规，`criteria` 需已按 position 排序并带上各自的表现等级
    pub fn into_rubric(
        self,
        criteria: Vec<crate::models::rubrics::entities::Criterion>,
    ) -> crate::models::rubrics::entities::Rubric {
        crate::models::rubrics::entities::Rubric {
            id: self.id,
            title: self.title,
            created_by: self.created_by,
            created_at: super::to_datetime(self.created_at),
            criteria,
        }
    }
}
