use std::collections::HashMap;

use super::{SeaOrmStorage, db_err};
use crate::entity::performance_levels::{
    ActiveModel as LevelActiveModel, Column as LevelColumn, Entity as PerformanceLevels,
};
use crate::entity::rubric_criteria::{
    ActiveModel as CriterionActiveModel, Column as CriterionColumn, Entity as RubricCriteria,
};
use crate::entity::rubrics::{ActiveModel as RubricActiveModel, Entity as Rubrics};
use crate::errors::Result;
use crate::models::rubrics::{
    entities::{PerformanceLevel, Rubric},
    requests::CreateRubricRequest,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

/// 加载量规及其维度、表现等级，维度与等级按 position 排序
pub(super) async fn load_rubric<C: ConnectionTrait>(
    conn: &C,
    rubric_id: i64,
) -> Result<Option<Rubric>> {
    let Some(rubric) = Rubrics::find_by_id(rubric_id)
        .one(conn)
        .await
        .map_err(db_err("查询评分量规失败"))?
    else {
        return Ok(None);
    };

    let criteria = RubricCriteria::find()
        .filter(CriterionColumn::RubricId.eq(rubric_id))
        .order_by_asc(CriterionColumn::Position)
        .all(conn)
        .await
        .map_err(db_err("查询评分维度失败"))?;

    let criterion_ids: Vec<i64> = criteria.iter().map(|c| c.id).collect();
    let mut levels_by_criterion: HashMap<i64, Vec<PerformanceLevel>> = HashMap::new();
    if !criterion_ids.is_empty() {
        let levels = PerformanceLevels::find()
            .filter(LevelColumn::CriterionId.is_in(criterion_ids))
            .order_by_asc(LevelColumn::Position)
            .all(conn)
            .await
            .map_err(db_err("查询表现等级失败"))?;
        for level in levels {
            levels_by_criterion
                .entry(level.criterion_id)
                .or_default()
                .push(level.into_level());
        }
    }

    let criteria = criteria
        .into_iter()
        .map(|c| {
            let levels = levels_by_criterion.remove(&c.id).unwrap_or_default();
            c.into_criterion(levels)
        })
        .collect();

    Ok(Some(rubric.into_rubric(criteria)))
}

impl SeaOrmStorage {
    /// 创建评分量规（含维度与表现等级），单事务写入
    pub async fn create_rubric_impl(
        &self,
        created_by: i64,
        req: CreateRubricRequest,
    ) -> Result<Rubric> {
        let txn = self.db.begin().await.map_err(db_err("开启事务失败"))?;

        let rubric = RubricActiveModel {
            title: Set(req.title),
            created_by: Set(created_by),
            created_at: Set(chrono::Utc::now().timestamp()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(db_err("创建评分量规失败"))?;

        for (position, criterion) in req.criteria.into_iter().enumerate() {
            let saved = CriterionActiveModel {
                rubric_id: Set(rubric.id),
                name: Set(criterion.name),
                description: Set(criterion.description),
                weight: Set(criterion.weight),
                max_points: Set(criterion.max_points),
                position: Set(position as i32),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(db_err("创建评分维度失败"))?;

            for (level_position, level) in criterion.levels.into_iter().enumerate() {
                LevelActiveModel {
                    criterion_id: Set(saved.id),
                    points: Set(level.points),
                    description: Set(level.description),
                    position: Set(level_position as i32),
                    ..Default::default()
                }
                .insert(&txn)
                .await
                .map_err(db_err("创建表现等级失败"))?;
            }
        }

        let created = load_rubric(&txn, rubric.id).await?;
        txn.commit().await.map_err(db_err("提交事务失败"))?;

        created.ok_or_else(|| {
            crate::errors::PeerReviewError::database_operation("新建的评分量规读取失败")
        })
    }

    /// 通过 ID 获取评分量规
    pub async fn get_rubric_by_id_impl(&self, rubric_id: i64) -> Result<Option<Rubric>> {
        load_rubric(&self.db, rubric_id).await
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::test_support::{create_rubric, create_user, memory_storage};
    use crate::models::users::entities::UserRole;

    #[tokio::test]
    async fn test_rubric_is_loaded_in_order() {
        let storage = memory_storage().await;
        let instructor = create_user(&storage, "prof", UserRole::Instructor).await;
        let created = create_rubric(&storage, instructor.id).await;

        let loaded = storage.get_rubric_by_id(created.id).await.unwrap().unwrap();

        let names: Vec<&str> = loaded.criteria.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Argument", "Style"]);
        assert_eq!(loaded.criteria[0].levels.len(), 2);
        assert_eq!(loaded.criteria[0].levels[1].points, 10.0);
        assert!(loaded.criteria[1].levels.is_empty());
        assert_eq!(loaded.total_weight(), 3.0);
    }

    #[tokio::test]
    async fn test_missing_rubric() {
        let storage = memory_storage().await;
        assert!(storage.get_rubric_by_id(42).await.unwrap().is_none());
    }
}
