//! 发布闸门：AI 互评在教师发布前对学生不可见

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};

use super::PeerReviewService;
use crate::errors::{PeerReviewError, Result};
use crate::models::ApiResponse;
use crate::models::peer_reviews::responses::{
    PeerReviewResponse, ReleaseCountResponse, UnreleasedCountResponse,
};
use crate::models::users::entities::User;
use crate::services::current_user;
use crate::services::notifier::{Notifier, Recipient, TEMPLATE_REVIEW_RELEASED, notify_best_effort};
use crate::services::ownership::{OwnedResource, OwnershipResolver};
use crate::storage::Storage;

async fn ensure_assignment_exists(storage: &Arc<dyn Storage>, assignment_id: i64) -> Result<()> {
    match storage.get_assignment_by_id(assignment_id).await? {
        Some(_) => Ok(()),
        None => Err(PeerReviewError::not_found(format!(
            "Assignment {assignment_id} not found"
        ))),
    }
}

/// 发布单条 AI 互评
///
/// 课程教师与管理员可以发布，管理员不经过归属链比对。
/// 归属校验先于存在性校验，归属链断裂同样返回 `Forbidden`。
/// 发布本身是条件更新，并发调用只有一个成功，其余得到 `AlreadyReleased`。
pub async fn release_review(
    storage: &Arc<dyn Storage>,
    notifier: &Arc<dyn Notifier>,
    caller: &User,
    review_id: i64,
) -> Result<PeerReviewResponse> {
    OwnershipResolver::new(storage.as_ref())
        .ensure_owner(caller, OwnedResource::Review(review_id))
        .await?;

    let mut detail = storage
        .get_peer_review(review_id)
        .await?
        .ok_or_else(|| PeerReviewError::not_found(format!("Peer review {review_id} not found")))?;

    if !detail.review.is_ai_generated {
        return Err(PeerReviewError::not_applicable(
            "Human reviews are visible on creation and need no release",
        ));
    }
    if detail.review.is_released {
        return Err(PeerReviewError::already_released(format!(
            "Peer review {review_id} is already released"
        )));
    }

    if storage.release_peer_review(review_id).await? == 0 {
        return Err(PeerReviewError::already_released(format!(
            "Peer review {review_id} is already released"
        )));
    }
    info!("AI review {} released by user {}", review_id, caller.id);
    detail.review.is_released = true;

    notify_best_effort(
        notifier.as_ref(),
        Recipient::User(detail.submission_author_id),
        TEMPLATE_REVIEW_RELEASED,
        json!({
            "review_id": review_id,
            "submission_id": detail.review.submission_id,
        }),
    )
    .await;

    Ok(PeerReviewResponse::from_detail(detail, true))
}

/// 批量发布作业下所有未发布的 AI 互评，返回本次发布的数量
pub async fn release_assignment(
    storage: &Arc<dyn Storage>,
    notifier: &Arc<dyn Notifier>,
    caller: &User,
    assignment_id: i64,
) -> Result<ReleaseCountResponse> {
    ensure_assignment_exists(storage, assignment_id).await?;
    OwnershipResolver::new(storage.as_ref())
        .ensure_owner(caller, OwnedResource::Assignment(assignment_id))
        .await?;

    // 通知对象在更新前确定，数量以条件更新的结果为准
    let pending: Vec<(i64, i64)> = storage
        .list_peer_reviews_for_assignment(assignment_id)
        .await?
        .into_iter()
        .filter(|d| d.review.is_ai_generated && !d.review.is_released)
        .map(|d| (d.review.id, d.submission_author_id))
        .collect();

    let released_count = storage.release_assignment_reviews(assignment_id).await?;

    if released_count > 0 {
        let authors: BTreeSet<i64> = pending.iter().map(|(_, author)| *author).collect();
        for author in authors {
            let review_ids: Vec<i64> = pending
                .iter()
                .filter(|(_, a)| *a == author)
                .map(|(id, _)| *id)
                .collect();
            notify_best_effort(
                notifier.as_ref(),
                Recipient::User(author),
                TEMPLATE_REVIEW_RELEASED,
                json!({
                    "assignment_id": assignment_id,
                    "review_ids": review_ids,
                }),
            )
            .await;
        }
    }

    Ok(ReleaseCountResponse {
        assignment_id,
        released_count,
    })
}

/// 统计作业下未发布的 AI 互评
///
/// 只是聚合数字，除作业存在外不做归属校验；路由层限定教师与管理员角色。
pub async fn count_unreleased(
    storage: &Arc<dyn Storage>,
    caller: &User,
    assignment_id: i64,
) -> Result<UnreleasedCountResponse> {
    ensure_assignment_exists(storage, assignment_id).await?;
    debug!(
        "User {} counting unreleased reviews of assignment {}",
        caller.id, assignment_id
    );

    Ok(UnreleasedCountResponse {
        assignment_id,
        unreleased_count: storage.count_unreleased_reviews(assignment_id).await?,
    })
}

pub async fn handle_release_one(
    service: &PeerReviewService,
    request: &HttpRequest,
    review_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let notifier = service.get_notifier(request);
    let result = async {
        let caller = current_user(request)?;
        release_review(&storage, &notifier, &caller, review_id).await
    }
    .await;

    Ok(ApiResponse::respond(result, "Peer review released"))
}

pub async fn handle_release_all(
    service: &PeerReviewService,
    request: &HttpRequest,
    assignment_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let notifier = service.get_notifier(request);
    let result = async {
        let caller = current_user(request)?;
        release_assignment(&storage, &notifier, &caller, assignment_id).await
    }
    .await;

    Ok(ApiResponse::respond(result, "Peer reviews released"))
}

pub async fn handle_count_unreleased(
    service: &PeerReviewService,
    request: &HttpRequest,
    assignment_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let result = async {
        let caller = current_user(request)?;
        count_unreleased(&storage, &caller, assignment_id).await
    }
    .await;

    Ok(ApiResponse::respond(result, "Unreleased reviews counted"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::peer_reviews::entities::NewPeerReview;
    use crate::services::notifier::recording::RecordingNotifier;
    use crate::storage::test_support::{Fixture, create_submission};

    async fn ai_review(fx: &Fixture, submission_id: i64) -> i64 {
        fx.storage
            .deposit_ai_review(
                NewPeerReview::ai_generated(submission_id, fx.admin.id, "Generated".into()),
                None,
                vec![],
            )
            .await
            .unwrap()
            .review
            .id
    }

    fn recorder() -> (Arc<RecordingNotifier>, Arc<dyn Notifier>) {
        let recorder = Arc::new(RecordingNotifier::default());
        let notifier: Arc<dyn Notifier> = recorder.clone();
        (recorder, notifier)
    }

    #[tokio::test]
    async fn test_release_is_monotonic() {
        let fx = Fixture::new().await;
        let (recorder, notifier) = recorder();
        let id = ai_review(&fx, fx.submission.id).await;

        let resp = release_review(&fx.storage, &notifier, &fx.instructor, id)
            .await
            .unwrap();
        assert!(resp.review.is_released);

        let err = release_review(&fx.storage, &notifier, &fx.instructor, id)
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), "Already Released");

        let stored = fx.storage.get_peer_review(id).await.unwrap().unwrap();
        assert!(stored.review.is_released);

        let sent = recorder.sent_with(TEMPLATE_REVIEW_RELEASED);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, Recipient::User(fx.author.id));
    }

    #[tokio::test]
    async fn test_human_review_is_not_applicable() {
        let fx = Fixture::new().await;
        let (_, notifier) = recorder();
        let human = fx
            .storage
            .create_peer_review(NewPeerReview::human(fx.submission.id, fx.reviewer.id))
            .await
            .unwrap();

        let err = release_review(&fx.storage, &notifier, &fx.instructor, human.id)
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), "Not Applicable");
    }

    #[tokio::test]
    async fn test_foreign_instructor_cannot_release() {
        let fx = Fixture::new().await;
        let (recorder, notifier) = recorder();
        let id = ai_review(&fx, fx.submission.id).await;

        let err = release_review(&fx.storage, &notifier, &fx.other_instructor, id)
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), "Forbidden");

        // 不存在的互评对教师同样表现为无权限
        let err = release_review(&fx.storage, &notifier, &fx.instructor, 9999)
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), "Forbidden");

        let err = release_assignment(&fx.storage, &notifier, &fx.other_instructor, fx.assignment.id)
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), "Forbidden");

        assert_eq!(fx.storage.count_unreleased_reviews(fx.assignment.id).await.unwrap(), 1);
        assert!(recorder.sent().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_release_then_nothing_left() {
        let fx = Fixture::new().await;
        let (recorder, notifier) = recorder();
        let carol = create_submission(&fx.storage, fx.assignment.id, fx.other_student.id).await;
        ai_review(&fx, fx.submission.id).await;
        ai_review(&fx, carol.id).await;

        let before = count_unreleased(&fx.storage, &fx.instructor, fx.assignment.id)
            .await
            .unwrap();
        assert_eq!(before.unreleased_count, 2);

        let first = release_assignment(&fx.storage, &notifier, &fx.instructor, fx.assignment.id)
            .await
            .unwrap();
        assert_eq!(first.released_count, 2);

        let second = release_assignment(&fx.storage, &notifier, &fx.instructor, fx.assignment.id)
            .await
            .unwrap();
        assert_eq!(second.released_count, 0);

        let after = count_unreleased(&fx.storage, &fx.admin, fx.assignment.id)
            .await
            .unwrap();
        assert_eq!(after.unreleased_count, 0);

        // 每位作者一条通知，第二次批量发布不再通知
        assert_eq!(recorder.sent_with(TEMPLATE_REVIEW_RELEASED).len(), 2);
    }

    #[tokio::test]
    async fn test_count_needs_no_ownership() {
        let fx = Fixture::new().await;
        ai_review(&fx, fx.submission.id).await;

        for caller in [&fx.instructor, &fx.other_instructor, &fx.author] {
            let resp = count_unreleased(&fx.storage, caller, fx.assignment.id)
                .await
                .unwrap();
            assert_eq!(resp.unreleased_count, 1);
        }
    }

    #[tokio::test]
    async fn test_admin_releases_without_owning_course() {
        let fx = Fixture::new().await;
        let (recorder, notifier) = recorder();
        let id = ai_review(&fx, fx.submission.id).await;

        let resp = release_review(&fx.storage, &notifier, &fx.admin, id)
            .await
            .unwrap();
        assert!(resp.review.is_released);
        assert_eq!(recorder.sent_with(TEMPLATE_REVIEW_RELEASED).len(), 1);
    }

    #[tokio::test]
    async fn test_release_on_missing_assignment() {
        let fx = Fixture::new().await;
        let (_, notifier) = recorder();

        let err = release_assignment(&fx.storage, &notifier, &fx.instructor, 404)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E006");

        let err = count_unreleased(&fx.storage, &fx.instructor, 404)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E006");
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_undo_release() {
        let fx = Fixture::new().await;
        let notifier: Arc<dyn Notifier> = Arc::new(RecordingNotifier::failing());
        let id = ai_review(&fx, fx.submission.id).await;

        release_review(&fx.storage, &notifier, &fx.instructor, id)
            .await
            .unwrap();

        assert_eq!(fx.storage.count_unreleased_reviews(fx.assignment.id).await.unwrap(), 0);
    }
}
