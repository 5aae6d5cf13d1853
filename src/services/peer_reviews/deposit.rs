use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use serde_json::json;
use tracing::info;

use super::PeerReviewService;
use super::scores::{rubric_for_submission, validate_entries};
use crate::errors::{PeerReviewError, Result};
use crate::models::ApiResponse;
use crate::models::peer_reviews::{
    entities::NewPeerReview, requests::DepositAiReviewRequest, responses::PeerReviewResponse,
};
use crate::models::users::entities::User;
use crate::services::current_user;
use crate::services::notifier::{
    Notifier, Recipient, TEMPLATE_AI_REVIEW_PENDING, notify_best_effort,
};
use crate::services::ownership::{OwnedResource, OwnershipResolver};
use crate::storage::Storage;

/// 写入 AI 生成的互评
///
/// 互评以调用者（AI 服务账号）作为评审人，状态为 completed，未发布。
/// 评分与人工评分使用相同的校验，和互评在同一事务内写入。
pub async fn deposit_ai_review(
    storage: &Arc<dyn Storage>,
    notifier: &Arc<dyn Notifier>,
    producer: &User,
    submission_id: i64,
    req: DepositAiReviewRequest,
) -> Result<PeerReviewResponse> {
    let submission = storage
        .get_submission_by_id(submission_id)
        .await?
        .ok_or_else(|| {
            PeerReviewError::not_found(format!("Submission {submission_id} not found"))
        })?;

    if producer.id == submission.author_id {
        return Err(PeerReviewError::self_review_forbidden(
            "The producer account authored this submission",
        ));
    }
    if req.overall_feedback.trim().is_empty() {
        return Err(PeerReviewError::validation(
            "AI review must carry overall feedback",
        ));
    }

    let rubric = rubric_for_submission(storage, submission_id).await?;
    let scores = match (&rubric, req.scores.is_empty()) {
        (_, true) => vec![],
        (Some(rubric), false) => validate_entries(rubric, req.scores)?,
        (None, false) => {
            return Err(PeerReviewError::criterion_mismatch(
                "The assignment of this submission has no rubric bound",
            ));
        }
    };

    let detail = storage
        .deposit_ai_review(
            NewPeerReview::ai_generated(submission_id, producer.id, req.overall_feedback),
            rubric.as_ref(),
            scores,
        )
        .await?;
    info!(
        "AI review {} deposited for submission {}",
        detail.review.id, submission_id
    );

    let resolver = OwnershipResolver::new(storage.as_ref());
    if let Some(instructor_id) = resolver
        .instructor_for(OwnedResource::Submission(submission_id))
        .await?
    {
        notify_best_effort(
            notifier.as_ref(),
            Recipient::User(instructor_id),
            TEMPLATE_AI_REVIEW_PENDING,
            json!({
                "review_id": detail.review.id,
                "submission_id": submission_id,
                "assignment_id": submission.assignment_id,
            }),
        )
        .await;
    }

    let reveal = resolver
        .is_owner(producer, OwnedResource::Submission(submission_id))
        .await?;
    Ok(PeerReviewResponse::from_detail(detail, reveal))
}

pub async fn handle_deposit(
    service: &PeerReviewService,
    request: &HttpRequest,
    submission_id: i64,
    body: DepositAiReviewRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let notifier = service.get_notifier(request);
    let result = async {
        let caller = current_user(request)?;
        deposit_ai_review(&storage, &notifier, &caller, submission_id, body).await
    }
    .await;

    Ok(ApiResponse::respond_created(result, "AI review deposited"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::peer_reviews::entities::ReviewStatus;
    use crate::models::peer_reviews::requests::ScoreEntry;
    use crate::services::notifier::recording::RecordingNotifier;
    use crate::storage::test_support::Fixture;

    fn request(scores: Vec<ScoreEntry>) -> DepositAiReviewRequest {
        DepositAiReviewRequest {
            overall_feedback: "Clear structure, weak conclusion".to_string(),
            scores,
        }
    }

    #[tokio::test]
    async fn test_deposit_creates_unreleased_completed_review() {
        let fx = Fixture::new().await;
        let recorder = Arc::new(RecordingNotifier::default());
        let notifier: Arc<dyn Notifier> = recorder.clone();
        let argument = fx.criterion_id("Argument");

        let resp = deposit_ai_review(
            &fx.storage,
            &notifier,
            &fx.admin,
            fx.submission.id,
            request(vec![ScoreEntry {
                criterion_id: argument,
                score: 9.0,
                feedback: Some("Convincing".to_string()),
            }]),
        )
        .await
        .unwrap();

        assert!(resp.review.is_ai_generated);
        assert!(!resp.review.is_released);
        assert_eq!(resp.review.status, ReviewStatus::Completed);
        assert!(resp.review.completed_date.is_some());
        assert_eq!(resp.review.total_score, Some(6.0));
        assert_eq!(resp.scores.len(), 1);

        let sent = recorder.sent_with(TEMPLATE_AI_REVIEW_PENDING);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, Recipient::User(fx.instructor.id));
    }

    #[tokio::test]
    async fn test_invalid_scores_write_nothing() {
        let fx = Fixture::new().await;
        let notifier: Arc<dyn Notifier> = Arc::new(RecordingNotifier::default());

        let err = deposit_ai_review(
            &fx.storage,
            &notifier,
            &fx.admin,
            fx.submission.id,
            request(vec![ScoreEntry {
                criterion_id: fx.criterion_id("Style"),
                score: 7.0,
                feedback: None,
            }]),
        )
        .await
        .unwrap_err();

        assert_eq!(err.error_type(), "Score Out Of Range");
        assert_eq!(
            fx.storage
                .count_unreleased_reviews(fx.assignment.id)
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_second_deposit_by_same_producer_is_duplicate() {
        let fx = Fixture::new().await;
        let notifier: Arc<dyn Notifier> = Arc::new(RecordingNotifier::default());

        deposit_ai_review(&fx.storage, &notifier, &fx.admin, fx.submission.id, request(vec![]))
            .await
            .unwrap();
        let err = deposit_ai_review(
            &fx.storage,
            &notifier,
            &fx.admin,
            fx.submission.id,
            request(vec![]),
        )
        .await
        .unwrap_err();

        assert_eq!(err.error_type(), "Duplicate Assignment");
    }

    #[tokio::test]
    async fn test_producer_cannot_review_own_submission() {
        let fx = Fixture::new().await;
        let notifier: Arc<dyn Notifier> = Arc::new(RecordingNotifier::default());

        let err = deposit_ai_review(
            &fx.storage,
            &notifier,
            &fx.author,
            fx.submission.id,
            request(vec![]),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_type(), "Self Review Forbidden");
    }
}
