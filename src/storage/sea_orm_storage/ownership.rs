//! 归属链查询：提交 → 作业 → 课程 → 教师
//!
//! 每个查询都是一条只读 JOIN，任何一环缺失都得到 None。

use super::{SeaOrmStorage, db_err};
use crate::entity::{assignments, courses, peer_reviews, submissions};
use crate::errors::Result;
use sea_orm::{EntityTrait, JoinType, QuerySelect, RelationTrait};

impl SeaOrmStorage {
    pub async fn resolve_instructor_for_review_impl(&self, review_id: i64) -> Result<Option<i64>> {
        peer_reviews::Entity::find_by_id(review_id)
            .select_only()
            .column(courses::Column::InstructorId)
            .join(JoinType::InnerJoin, peer_reviews::Relation::Submission.def())
            .join(JoinType::InnerJoin, submissions::Relation::Assignment.def())
            .join(JoinType::InnerJoin, assignments::Relation::Course.def())
            .into_tuple::<i64>()
            .one(&self.db)
            .await
            .map_err(db_err("查询互评归属失败"))
    }

    pub async fn resolve_instructor_for_submission_impl(
        &self,
        submission_id: i64,
    ) -> Result<Option<i64>> {
        submissions::Entity::find_by_id(submission_id)
            .select_only()
            .column(courses::Column::InstructorId)
            .join(JoinType::InnerJoin, submissions::Relation::Assignment.def())
            .join(JoinType::InnerJoin, assignments::Relation::Course.def())
            .into_tuple::<i64>()
            .one(&self.db)
            .await
            .map_err(db_err("查询提交归属失败"))
    }

    pub async fn resolve_instructor_for_assignment_impl(
        &self,
        assignment_id: i64,
    ) -> Result<Option<i64>> {
        assignments::Entity::find_by_id(assignment_id)
            .select_only()
            .column(courses::Column::InstructorId)
            .join(JoinType::InnerJoin, assignments::Relation::Course.def())
            .into_tuple::<i64>()
            .one(&self.db)
            .await
            .map_err(db_err("查询作业归属失败"))
    }
}

#[cfg(test)]
mod tests {
    use crate::models::peer_reviews::entities::NewPeerReview;
    use crate::storage::test_support::Fixture;

    #[tokio::test]
    async fn test_chain_resolves_to_course_instructor() {
        let fx = Fixture::new().await;
        let review = fx
            .storage
            .create_peer_review(NewPeerReview::human(fx.submission.id, fx.reviewer.id))
            .await
            .unwrap();

        let expected = Some(fx.instructor.id);
        assert_eq!(
            fx.storage.resolve_instructor_for_review(review.id).await.unwrap(),
            expected
        );
        assert_eq!(
            fx.storage
                .resolve_instructor_for_submission(fx.submission.id)
                .await
                .unwrap(),
            expected
        );
        assert_eq!(
            fx.storage
                .resolve_instructor_for_assignment(fx.assignment.id)
                .await
                .unwrap(),
            expected
        );
    }

    #[tokio::test]
    async fn test_missing_link_resolves_to_none() {
        let fx = Fixture::new().await;
        assert_eq!(fx.storage.resolve_instructor_for_review(404).await.unwrap(), None);
        assert_eq!(
            fx.storage.resolve_instructor_for_assignment(404).await.unwrap(),
            None
        );
    }
}
