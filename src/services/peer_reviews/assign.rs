use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use serde_json::json;
use tracing::info;

use super::PeerReviewService;
use crate::errors::{PeerReviewError, Result};
use crate::models::ApiResponse;
use crate::models::peer_reviews::{
    entities::{NewPeerReview, PeerReviewDetail},
    requests::AssignReviewRequest,
    responses::PeerReviewResponse,
};
use crate::models::users::entities::{User, UserRole};
use crate::services::notifier::{Notifier, Recipient, TEMPLATE_REVIEW_ASSIGNED, notify_best_effort};
use crate::services::ownership::{OwnedResource, OwnershipResolver};
use crate::services::current_user;
use crate::storage::Storage;

/// 为提交分配一名学生评审人
///
/// 校验顺序：提交存在 → 调用者拥有课程 → 评审人存在且为学生 → 非本人 → 未重复分配。
/// 重复分配由唯一索引兜底，存储层把冲突转换为 `DuplicateAssignment`。
pub async fn assign_review(
    storage: &Arc<dyn Storage>,
    notifier: &Arc<dyn Notifier>,
    caller: &User,
    req: AssignReviewRequest,
) -> Result<PeerReviewResponse> {
    let submission = storage
        .get_submission_by_id(req.submission_id)
        .await?
        .ok_or_else(|| {
            PeerReviewError::not_found(format!("Submission {} not found", req.submission_id))
        })?;

    OwnershipResolver::new(storage.as_ref())
        .ensure_owner(caller, OwnedResource::Submission(submission.id))
        .await?;

    let reviewer = storage
        .get_user_by_id(req.reviewer_id)
        .await?
        .ok_or_else(|| {
            PeerReviewError::not_found(format!("Reviewer {} not found", req.reviewer_id))
        })?;
    if reviewer.role != UserRole::Student {
        return Err(PeerReviewError::validation(format!(
            "User {} is not a student and cannot be assigned as reviewer",
            reviewer.id
        )));
    }
    if reviewer.id == submission.author_id {
        return Err(PeerReviewError::self_review_forbidden(
            "A student cannot review their own submission",
        ));
    }

    let review = storage
        .create_peer_review(NewPeerReview::human(submission.id, reviewer.id))
        .await?;
    info!(
        "Reviewer {} assigned to submission {} (review {})",
        reviewer.id, submission.id, review.id
    );

    notify_best_effort(
        notifier.as_ref(),
        Recipient::User(reviewer.id),
        TEMPLATE_REVIEW_ASSIGNED,
        json!({
            "review_id": review.id,
            "submission_id": submission.id,
            "assignment_id": submission.assignment_id,
        }),
    )
    .await;

    Ok(PeerReviewResponse::from_detail(
        PeerReviewDetail {
            review,
            reviewer_display_name: reviewer.display_name(),
            submission_author_id: submission.author_id,
            scores: vec![],
        },
        true,
    ))
}

pub async fn handle_assign(
    service: &PeerReviewService,
    request: &HttpRequest,
    body: AssignReviewRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let notifier = service.get_notifier(request);

    let result = async {
        let caller = current_user(request)?;
        assign_review(&storage, &notifier, &caller, body).await
    }
    .await;

    Ok(ApiResponse::respond_created(result, "Reviewer assigned"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::notifier::recording::RecordingNotifier;
    use crate::storage::test_support::{Fixture, create_user};

    fn request(submission_id: i64, reviewer_id: i64) -> AssignReviewRequest {
        AssignReviewRequest {
            submission_id,
            reviewer_id,
        }
    }

    #[tokio::test]
    async fn test_assign_creates_released_human_review() {
        let fx = Fixture::new().await;
        let recorder = Arc::new(RecordingNotifier::default());
        let notifier: Arc<dyn Notifier> = recorder.clone();

        let resp = assign_review(
            &fx.storage,
            &notifier,
            &fx.instructor,
            request(fx.submission.id, fx.reviewer.id),
        )
        .await
        .unwrap();

        assert_eq!(resp.review.reviewer_id, fx.reviewer.id);
        assert_eq!(resp.reviewer.display_name, "bob display");
        assert!(!resp.review.is_ai_generated);
        assert!(resp.review.is_released);
        assert!(resp.review.completed_date.is_none());

        let sent = recorder.sent_with(TEMPLATE_REVIEW_ASSIGNED);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, Recipient::User(fx.reviewer.id));
        assert_eq!(sent[0].data["review_id"], resp.review.id);
    }

    #[tokio::test]
    async fn test_self_review_is_rejected() {
        let fx = Fixture::new().await;
        let notifier: Arc<dyn Notifier> = Arc::new(RecordingNotifier::default());

        let err = assign_review(
            &fx.storage,
            &notifier,
            &fx.instructor,
            request(fx.submission.id, fx.author.id),
        )
        .await
        .unwrap_err();

        assert_eq!(err.error_type(), "Self Review Forbidden");
        let listed = fx
            .storage
            .list_peer_reviews_for_assignment(fx.assignment.id)
            .await
            .unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_assignment_is_rejected() {
        let fx = Fixture::new().await;
        let notifier: Arc<dyn Notifier> = Arc::new(RecordingNotifier::default());
        let req = || request(fx.submission.id, fx.reviewer.id);

        assign_review(&fx.storage, &notifier, &fx.instructor, req())
            .await
            .unwrap();
        let err = assign_review(&fx.storage, &notifier, &fx.instructor, req())
            .await
            .unwrap_err();

        assert_eq!(err.error_type(), "Duplicate Assignment");
    }

    #[tokio::test]
    async fn test_foreign_instructor_is_forbidden() {
        let fx = Fixture::new().await;
        let notifier: Arc<dyn Notifier> = Arc::new(RecordingNotifier::default());

        let err = assign_review(
            &fx.storage,
            &notifier,
            &fx.other_instructor,
            request(fx.submission.id, fx.reviewer.id),
        )
        .await
        .unwrap_err();

        assert_eq!(err.error_type(), "Forbidden");
    }

    #[tokio::test]
    async fn test_reviewer_must_exist_and_be_a_student() {
        let fx = Fixture::new().await;
        let notifier: Arc<dyn Notifier> = Arc::new(RecordingNotifier::default());
        let ta = create_user(&fx.storage, "teaching", UserRole::Instructor).await;

        let err = assign_review(
            &fx.storage,
            &notifier,
            &fx.admin,
            request(fx.submission.id, 9999),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_type(), "Resource Not Found");

        let err = assign_review(&fx.storage, &notifier, &fx.admin, request(fx.submission.id, ta.id))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), "Validation Error");
    }

    #[tokio::test]
    async fn test_missing_submission() {
        let fx = Fixture::new().await;
        let notifier: Arc<dyn Notifier> = Arc::new(RecordingNotifier::default());

        let err = assign_review(&fx.storage, &notifier, &fx.instructor, request(404, fx.reviewer.id))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E006");
    }
}
