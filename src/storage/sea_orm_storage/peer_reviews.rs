use std::collections::HashMap;

use super::review_scores::{recompute_total, upsert_scores};
use super::{SeaOrmStorage, db_err, is_unique_violation};
use crate::entity::peer_reviews::{
    ActiveModel, Column, Entity as PeerReviews, Model as PeerReviewModel,
};
use crate::entity::review_scores::{Column as ReviewScoreColumn, Entity as ReviewScores};
use crate::entity::submissions::{Column as SubmissionColumn, Entity as Submissions};
use crate::entity::users::{Column as UserColumn, Entity as Users};
use crate::errors::{PeerReviewError, Result};
use crate::models::peer_reviews::entities::{
    NewPeerReview, PeerReview, PeerReviewDetail, ReviewScore, ReviewStatus, ValidatedScore,
};
use crate::models::rubrics::entities::Rubric;
use crate::models::users::entities::User;
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::info;

/// 作业下所有提交的 ID 子查询
fn submissions_of_assignment(assignment_id: i64) -> sea_orm::sea_query::SelectStatement {
    Query::select()
        .column(SubmissionColumn::Id)
        .from(Submissions)
        .and_where(SubmissionColumn::AssignmentId.eq(assignment_id))
        .to_owned()
}

/// 插入互评，唯一索引冲突转换为 DuplicateAssignment
async fn insert_review<C: ConnectionTrait>(conn: &C, review: NewPeerReview) -> Result<PeerReviewModel> {
    let now = chrono::Utc::now().timestamp();
    let is_released = review.is_released();

    let model = ActiveModel {
        submission_id: Set(review.submission_id),
        reviewer_id: Set(review.reviewer_id),
        status: Set(review.status.to_string()),
        is_ai_generated: Set(review.is_ai_generated),
        is_released: Set(is_released),
        overall_feedback: Set(review.overall_feedback),
        total_score: Set(None),
        assigned_date: Set(now),
        completed_date: Set(review.status.is_terminal().then_some(now)),
        ..Default::default()
    };

    match model.insert(conn).await {
        Ok(m) => Ok(m),
        Err(e) if is_unique_violation(&e) => Err(PeerReviewError::duplicate_assignment(format!(
            "User {} is already assigned to review submission {}",
            review.reviewer_id, review.submission_id
        ))),
        Err(e) => Err(db_err("创建互评失败")(e)),
    }
}

/// 补全评审人名称、提交作者与评分明细
pub(super) async fn assemble_details<C: ConnectionTrait>(
    conn: &C,
    reviews: Vec<PeerReviewModel>,
) -> Result<Vec<PeerReviewDetail>> {
    if reviews.is_empty() {
        return Ok(vec![]);
    }

    let review_ids: Vec<i64> = reviews.iter().map(|r| r.id).collect();
    let mut reviewer_ids: Vec<i64> = reviews.iter().map(|r| r.reviewer_id).collect();
    reviewer_ids.sort_unstable();
    reviewer_ids.dedup();
    let mut submission_ids: Vec<i64> = reviews.iter().map(|r| r.submission_id).collect();
    submission_ids.sort_unstable();
    submission_ids.dedup();

    let reviewers: HashMap<i64, User> = Users::find()
        .filter(UserColumn::Id.is_in(reviewer_ids))
        .all(conn)
        .await
        .map_err(db_err("查询评审人失败"))?
        .into_iter()
        .map(|m| (m.id, m.into_user()))
        .collect();

    let authors: HashMap<i64, i64> = Submissions::find()
        .filter(SubmissionColumn::Id.is_in(submission_ids))
        .all(conn)
        .await
        .map_err(db_err("查询提交失败"))?
        .into_iter()
        .map(|m| (m.id, m.author_id))
        .collect();

    let mut scores: HashMap<i64, Vec<ReviewScore>> = HashMap::new();
    for score in ReviewScores::find()
        .filter(ReviewScoreColumn::PeerReviewId.is_in(review_ids))
        .order_by_asc(ReviewScoreColumn::Id)
        .all(conn)
        .await
        .map_err(db_err("查询评分失败"))?
    {
        scores
            .entry(score.peer_review_id)
            .or_default()
            .push(score.into_review_score());
    }

    let details = reviews
        .into_iter()
        .map(|model| {
            let reviewer_display_name = reviewers
                .get(&model.reviewer_id)
                .map(|u| u.display_name())
                .unwrap_or_default();
            let submission_author_id = authors.get(&model.submission_id).copied().unwrap_or(0);
            let review_scores = scores.remove(&model.id).unwrap_or_default();

            PeerReviewDetail {
                review: model.into_peer_review(),
                reviewer_display_name,
                submission_author_id,
                scores: review_scores,
            }
        })
        .collect();

    Ok(details)
}

pub(super) async fn load_detail<C: ConnectionTrait>(
    conn: &C,
    review_id: i64,
) -> Result<Option<PeerReviewDetail>> {
    let Some(model) = PeerReviews::find_by_id(review_id)
        .one(conn)
        .await
        .map_err(db_err("查询互评失败"))?
    else {
        return Ok(None);
    };

    Ok(assemble_details(conn, vec![model]).await?.pop())
}

impl SeaOrmStorage {
    /// 创建互评
    pub async fn create_peer_review_impl(&self, review: NewPeerReview) -> Result<PeerReview> {
        Ok(insert_review(&self.db, review).await?.into_peer_review())
    }

    pub async fn get_peer_review_impl(&self, review_id: i64) -> Result<Option<PeerReviewDetail>> {
        load_detail(&self.db, review_id).await
    }

    /// 列出作业下的全部互评
    pub async fn list_peer_reviews_for_assignment_impl(
        &self,
        assignment_id: i64,
    ) -> Result<Vec<PeerReviewDetail>> {
        let reviews = PeerReviews::find()
            .filter(Column::SubmissionId.in_subquery(submissions_of_assignment(assignment_id)))
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err("查询互评列表失败"))?;

        assemble_details(&self.db, reviews).await
    }

    /// 条件删除：只删除未完成的互评，评分明细同事务删除
    pub async fn delete_unfinished_peer_review_impl(&self, review_id: i64) -> Result<bool> {
        let txn = self.db.begin().await.map_err(db_err("开启事务失败"))?;

        let deleted = PeerReviews::delete_many()
            .filter(Column::Id.eq(review_id))
            .filter(Column::Status.ne(ReviewStatus::COMPLETED))
            .exec(&txn)
            .await
            .map_err(db_err("删除互评失败"))?
            .rows_affected;

        if deleted > 0 {
            ReviewScores::delete_many()
                .filter(ReviewScoreColumn::PeerReviewId.eq(review_id))
                .exec(&txn)
                .await
                .map_err(db_err("删除评分失败"))?;
        }

        txn.commit().await.map_err(db_err("提交事务失败"))?;

        Ok(deleted > 0)
    }

    /// 更新状态，completed_date 由状态迁移推导
    pub async fn update_peer_review_status_impl(
        &self,
        review_id: i64,
        status: ReviewStatus,
    ) -> Result<Option<PeerReview>> {
        let txn = self.db.begin().await.map_err(db_err("开启事务失败"))?;

        let Some(current) = PeerReviews::find_by_id(review_id)
            .one(&txn)
            .await
            .map_err(db_err("查询互评失败"))?
        else {
            return Ok(None);
        };

        let now = chrono::Utc::now().timestamp();
        let completed_date = ReviewStatus::completed_date_after(
            current.review_status(),
            current.completed_date,
            status,
            now,
        );

        // 以读取到的状态为条件，避免覆盖并发修改
        let updated = PeerReviews::update_many()
            .col_expr(Column::Status, Expr::value(status.to_string()))
            .col_expr(Column::CompletedDate, Expr::value(completed_date))
            .filter(Column::Id.eq(review_id))
            .filter(Column::Status.eq(current.status.clone()))
            .exec(&txn)
            .await
            .map_err(db_err("更新互评状态失败"))?
            .rows_affected;

        if updated == 0 {
            return Err(PeerReviewError::conflict(format!(
                "Review {review_id} was modified concurrently, please retry"
            )));
        }

        let model = PeerReviews::find_by_id(review_id)
            .one(&txn)
            .await
            .map_err(db_err("查询互评失败"))?;

        txn.commit().await.map_err(db_err("提交事务失败"))?;

        Ok(model.map(|m| m.into_peer_review()))
    }

    /// 写入 AI 互评，评分与总分同一事务完成
    pub async fn deposit_ai_review_impl(
        &self,
        review: NewPeerReview,
        rubric: Option<&Rubric>,
        scores: Vec<ValidatedScore>,
    ) -> Result<PeerReviewDetail> {
        let txn = self.db.begin().await.map_err(db_err("开启事务失败"))?;

        let model = insert_review(&txn, review).await?;

        if let Some(rubric) = rubric
            && !scores.is_empty()
        {
            upsert_scores(&txn, model.id, scores).await?;
            let total = recompute_total(&txn, model.id, rubric).await?;
            PeerReviews::update_many()
                .col_expr(Column::TotalScore, Expr::value(total))
                .filter(Column::Id.eq(model.id))
                .exec(&txn)
                .await
                .map_err(db_err("更新总分失败"))?;
        }

        let detail = load_detail(&txn, model.id).await?;
        txn.commit().await.map_err(db_err("提交事务失败"))?;

        detail.ok_or_else(|| PeerReviewError::database_operation("新建的互评读取失败"))
    }

    /// 发布单条 AI 互评
    ///
    /// 条件更新保证并发调用中只有一个成功。
    pub async fn release_peer_review_impl(&self, review_id: i64) -> Result<u64> {
        let result = PeerReviews::update_many()
            .col_expr(Column::IsReleased, Expr::value(true))
            .filter(Column::Id.eq(review_id))
            .filter(Column::IsAiGenerated.eq(true))
            .filter(Column::IsReleased.eq(false))
            .exec(&self.db)
            .await
            .map_err(db_err("发布互评失败"))?;

        Ok(result.rows_affected)
    }

    /// 批量发布作业下所有未发布的 AI 互评
    pub async fn release_assignment_reviews_impl(&self, assignment_id: i64) -> Result<u64> {
        let result = PeerReviews::update_many()
            .col_expr(Column::IsReleased, Expr::value(true))
            .filter(Column::SubmissionId.in_subquery(submissions_of_assignment(assignment_id)))
            .filter(Column::IsAiGenerated.eq(true))
            .filter(Column::IsReleased.eq(false))
            .exec(&self.db)
            .await
            .map_err(db_err("批量发布互评失败"))?;

        if result.rows_affected > 0 {
            info!(
                "作业 {} 发布了 {} 条 AI 互评",
                assignment_id,
                result.rows_affected
            );
        }

        Ok(result.rows_affected)
    }

    /// 统计作业下未发布的 AI 互评
    pub async fn count_unreleased_reviews_impl(&self, assignment_id: i64) -> Result<u64> {
        PeerReviews::find()
            .filter(Column::SubmissionId.in_subquery(submissions_of_assignment(assignment_id)))
            .filter(Column::IsAiGenerated.eq(true))
            .filter(Column::IsReleased.eq(false))
            .count(&self.db)
            .await
            .map_err(db_err("统计未发布互评失败"))
    }
}

#[cfg(test)]
mod tests {
    use crate::models::peer_reviews::entities::{NewPeerReview, ReviewStatus};
    use crate::storage::test_support::{Fixture, create_submission};

    #[tokio::test]
    async fn test_duplicate_pair_is_rejected_by_unique_index() {
        let fx = Fixture::new().await;
        fx.storage
            .create_peer_review(NewPeerReview::human(fx.submission.id, fx.reviewer.id))
            .await
            .unwrap();

        let err = fx
            .storage
            .create_peer_review(NewPeerReview::human(fx.submission.id, fx.reviewer.id))
            .await
            .unwrap_err();

        assert_eq!(err.error_type(), "Duplicate Assignment");
        assert_eq!(
            fx.storage
                .list_peer_reviews_for_assignment(fx.assignment.id)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_human_review_defaults() {
        let fx = Fixture::new().await;
        let review = fx
            .storage
            .create_peer_review(NewPeerReview::human(fx.submission.id, fx.reviewer.id))
            .await
            .unwrap();

        assert_eq!(review.status, ReviewStatus::Assigned);
        assert!(!review.is_ai_generated);
        assert!(review.is_released);
        assert!(review.completed_date.is_none());
    }

    #[tokio::test]
    async fn test_conditional_delete_keeps_completed_review() {
        let fx = Fixture::new().await;
        let review = fx
            .storage
            .create_peer_review(NewPeerReview::human(fx.submission.id, fx.reviewer.id))
            .await
            .unwrap();
        fx.storage
            .update_peer_review_status(review.id, ReviewStatus::Completed)
            .await
            .unwrap();

        assert!(!fx.storage.delete_unfinished_peer_review(review.id).await.unwrap());
        assert!(fx.storage.get_peer_review(review.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_bulk_release_only_touches_the_assignment() {
        let fx = Fixture::new().await;
        let other_submission =
            create_submission(&fx.storage, fx.assignment.id, fx.other_student.id).await;
        for submission_id in [fx.submission.id, other_submission.id] {
            fx.storage
                .create_peer_review(NewPeerReview::ai_generated(
                    submission_id,
                    fx.admin.id,
                    "Generated feedback".to_string(),
                ))
                .await
                .unwrap();
        }
        fx.storage
            .create_peer_review(NewPeerReview::human(fx.submission.id, fx.reviewer.id))
            .await
            .unwrap();

        assert_eq!(
            fx.storage
                .count_unreleased_reviews(fx.assignment.id)
                .await
                .unwrap(),
            2
        );
        assert_eq!(
            fx.storage
                .release_assignment_reviews(fx.assignment.id)
                .await
                .unwrap(),
            2
        );
        assert_eq!(
            fx.storage
                .release_assignment_reviews(fx.assignment.id)
                .await
                .unwrap(),
            0
        );
        assert_eq!(
            fx.storage
                .count_unreleased_reviews(fx.assignment.id)
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_list_carries_author_and_reviewer_name() {
        let fx = Fixture::new().await;
        fx.storage
            .create_peer_review(NewPeerReview::human(fx.submission.id, fx.reviewer.id))
            .await
            .unwrap();

        let details = fx
            .storage
            .list_peer_reviews_for_assignment(fx.assignment.id)
            .await
            .unwrap();

        assert_eq!(details.len(), 1);
        assert_eq!(details[0].submission_author_id, fx.author.id);
        assert_eq!(details[0].reviewer_display_name, "bob display");
    }
}
