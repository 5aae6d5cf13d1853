use std::collections::HashMap;

use super::peer_reviews::load_detail;
use super::{SeaOrmStorage, db_err};
use crate::entity::peer_reviews::{Column as PeerReviewColumn, Entity as PeerReviews};
use crate::entity::review_scores::{ActiveModel, Column, Entity as ReviewScores};
use crate::errors::{PeerReviewError, Result};
use crate::models::peer_reviews::entities::{PeerReviewDetail, ReviewStatus, ValidatedScore};
use crate::models::rubrics::entities::Rubric;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set, TransactionTrait};

/// 按 (review, criterion) 写入评分，已存在则覆盖
pub(super) async fn upsert_scores<C: ConnectionTrait>(
    conn: &C,
    review_id: i64,
    scores: Vec<ValidatedScore>,
) -> Result<()> {
    let now = chrono::Utc::now().timestamp();

    for entry in scores {
        let model = ActiveModel {
            peer_review_id: Set(review_id),
            criterion_id: Set(entry.criterion_id),
            score: Set(entry.score),
            feedback: Set(entry.feedback),
            updated_at: Set(now),
            ..Default::default()
        };

        ReviewScores::insert(model)
            .on_conflict(
                OnConflict::columns([Column::PeerReviewId, Column::CriterionId])
                    .update_columns([Column::Score, Column::Feedback, Column::UpdatedAt])
                    .to_owned(),
            )
            .exec(conn)
            .await
            .map_err(db_err("保存评分失败"))?;
    }

    Ok(())
}

/// 基于全部已存评分重算总分
pub(super) async fn recompute_total<C: ConnectionTrait>(
    conn: &C,
    review_id: i64,
    rubric: &Rubric,
) -> Result<Option<f64>> {
    let stored: HashMap<i64, f64> = ReviewScores::find()
        .filter(Column::PeerReviewId.eq(review_id))
        .all(conn)
        .await
        .map_err(db_err("查询评分失败"))?
        .into_iter()
        .map(|s| (s.criterion_id, s.score))
        .collect();

    Ok(rubric.weighted_total(&stored))
}

impl SeaOrmStorage {
    /// 单事务写入评分并重算总分
    ///
    /// 最后一步以 `status != completed` 为条件更新互评；若期间互评已完成，
    /// 整个事务回滚，评分保持原样。
    pub async fn save_review_scores_impl(
        &self,
        review_id: i64,
        rubric: &Rubric,
        scores: Vec<ValidatedScore>,
        overall_feedback: Option<String>,
    ) -> Result<PeerReviewDetail> {
        let txn = self.db.begin().await.map_err(db_err("开启事务失败"))?;

        upsert_scores(&txn, review_id, scores).await?;
        let total = recompute_total(&txn, review_id, rubric).await?;

        let mut update = PeerReviews::update_many()
            .col_expr(PeerReviewColumn::TotalScore, Expr::value(total));
        if let Some(feedback) = overall_feedback {
            update = update.col_expr(PeerReviewColumn::OverallFeedback, Expr::value(feedback));
        }

        let updated = update
            .filter(PeerReviewColumn::Id.eq(review_id))
            .filter(PeerReviewColumn::Status.ne(ReviewStatus::COMPLETED))
            .exec(&txn)
            .await
            .map_err(db_err("更新总分失败"))?
            .rows_affected;

        if updated == 0 {
            let exists = PeerReviews::find_by_id(review_id)
                .one(&txn)
                .await
                .map_err(db_err("查询互评失败"))?
                .is_some();
            return Err(if exists {
                PeerReviewError::invalid_state(format!(
                    "Review {review_id} is completed, scores can no longer change"
                ))
            } else {
                PeerReviewError::not_found(format!("Peer review {review_id} not found"))
            });
        }

        let detail = load_detail(&txn, review_id).await?;
        txn.commit().await.map_err(db_err("提交事务失败"))?;

        detail.ok_or_else(|| PeerReviewError::not_found(format!("Peer review {review_id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use crate::models::peer_reviews::entities::{NewPeerReview, ReviewStatus, ValidatedScore};
    use crate::storage::test_support::Fixture;

    fn score(criterion_id: i64, score: f64) -> ValidatedScore {
        ValidatedScore {
            criterion_id,
            score,
            feedback: None,
        }
    }

    #[tokio::test]
    async fn test_last_write_wins_and_total_is_recomputed() {
        let fx = Fixture::new().await;
        let argument = fx.criterion_id("Argument");
        let style = fx.criterion_id("Style");
        let review = fx
            .storage
            .create_peer_review(NewPeerReview::human(fx.submission.id, fx.reviewer.id))
            .await
            .unwrap();

        let first = fx
            .storage
            .save_review_scores(review.id, &fx.rubric, vec![score(argument, 6.0)], None)
            .await
            .unwrap();
        // 6*2 / 3
        assert_eq!(first.review.total_score, Some(4.0));

        let second = fx
            .storage
            .save_review_scores(
                review.id,
                &fx.rubric,
                vec![score(argument, 9.0), score(style, 3.0)],
                Some("Solid work".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(second.scores.len(), 2);
        // (9*2 + 3*1) / 3
        assert_eq!(second.review.total_score, Some(7.0));
        assert_eq!(second.review.overall_feedback.as_deref(), Some("Solid work"));
        let stored_argument = second
            .scores
            .iter()
            .find(|s| s.criterion_id == argument)
            .unwrap();
        assert_eq!(stored_argument.score, 9.0);
    }

    #[tokio::test]
    async fn test_completed_review_rolls_back_score_write() {
        let fx = Fixture::new().await;
        let argument = fx.criterion_id("Argument");
        let review = fx
            .storage
            .create_peer_review(NewPeerReview::human(fx.submission.id, fx.reviewer.id))
            .await
            .unwrap();
        fx.storage
            .save_review_scores(review.id, &fx.rubric, vec![score(argument, 5.0)], None)
            .await
            .unwrap();
        fx.storage
            .update_peer_review_status(review.id, ReviewStatus::Completed)
            .await
            .unwrap();

        let err = fx
            .storage
            .save_review_scores(review.id, &fx.rubric, vec![score(argument, 10.0)], None)
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), "Invalid State");

        let detail = fx.storage.get_peer_review(review.id).await.unwrap().unwrap();
        assert_eq!(detail.scores.len(), 1);
        assert_eq!(detail.scores[0].score, 5.0);
    }
}
