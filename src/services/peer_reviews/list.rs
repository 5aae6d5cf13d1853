use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use super::PeerReviewService;
use crate::errors::{PeerReviewError, Result};
use crate::models::ApiResponse;
use crate::models::peer_reviews::{
    entities::PeerReviewDetail,
    responses::{PeerReviewListResponse, PeerReviewResponse},
};
use crate::models::users::entities::User;
use crate::services::current_user;
use crate::services::ownership::{OwnedResource, OwnershipResolver};
use crate::storage::Storage;

// 非拥有者只能看到与自己有关、且对学生可见的互评
fn visible_to_participant(detail: &PeerReviewDetail, caller: &User) -> bool {
    let involved =
        detail.submission_author_id == caller.id || detail.review.reviewer_id == caller.id;
    involved && detail.review.is_visible_to_students()
}

/// 作业下的互评列表
///
/// 课程教师与管理员看到全部互评及评审人身份；其他用户只看到自己提交收到的、
/// 或自己负责撰写的互评，未发布的 AI 互评被过滤，评审人一律匿名。
pub async fn list_reviews(
    storage: &Arc<dyn Storage>,
    caller: &User,
    assignment_id: i64,
) -> Result<PeerReviewListResponse> {
    if storage.get_assignment_by_id(assignment_id).await?.is_none() {
        return Err(PeerReviewError::not_found(format!(
            "Assignment {assignment_id} not found"
        )));
    }

    let privileged = OwnershipResolver::new(storage.as_ref())
        .is_owner(caller, OwnedResource::Assignment(assignment_id))
        .await?;

    let items = storage
        .list_peer_reviews_for_assignment(assignment_id)
        .await?
        .into_iter()
        .filter(|detail| privileged || visible_to_participant(detail, caller))
        .map(|detail| PeerReviewResponse::from_detail(detail, privileged))
        .collect();

    Ok(PeerReviewListResponse {
        assignment_id,
        identities_revealed: privileged,
        items,
    })
}

/// 单条互评，可见性规则与列表一致
///
/// 对非拥有者，未发布的 AI 互评表现为不存在。
pub async fn get_review(
    storage: &Arc<dyn Storage>,
    caller: &User,
    review_id: i64,
) -> Result<PeerReviewResponse> {
    let detail = storage
        .get_peer_review(review_id)
        .await?
        .ok_or_else(|| PeerReviewError::not_found(format!("Peer review {review_id} not found")))?;

    let privileged = OwnershipResolver::new(storage.as_ref())
        .is_owner(caller, OwnedResource::Review(review_id))
        .await?;
    if privileged {
        return Ok(PeerReviewResponse::from_detail(detail, true));
    }

    if !detail.review.is_visible_to_students() {
        return Err(PeerReviewError::not_found(format!(
            "Peer review {review_id} not found"
        )));
    }
    if !visible_to_participant(&detail, caller) {
        return Err(PeerReviewError::forbidden(
            "Only the submission author and the assigned reviewer can view this review",
        ));
    }

    Ok(PeerReviewResponse::from_detail(detail, false))
}

pub async fn handle_list(
    service: &PeerReviewService,
    request: &HttpRequest,
    assignment_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let result = async {
        let caller = current_user(request)?;
        list_reviews(&storage, &caller, assignment_id).await
    }
    .await;

    Ok(ApiResponse::respond(result, "Peer reviews retrieved"))
}

pub async fn handle_get(
    service: &PeerReviewService,
    request: &HttpRequest,
    review_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let result = async {
        let caller = current_user(request)?;
        get_review(&storage, &caller, review_id).await
    }
    .await;

    Ok(ApiResponse::respond(result, "Peer review retrieved"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::peer_reviews::entities::NewPeerReview;
    use crate::models::peer_reviews::responses::ANONYMOUS_REVIEWER;
    use crate::storage::test_support::{Fixture, create_submission};

    struct Scenario {
        fx: Fixture,
        human_id: i64,
        ai_id: i64,
        unrelated_id: i64,
    }

    // alice 的提交有一条 bob 的人工互评和一条未发布的 AI 互评；
    // carol 的提交有一条 bob 的人工互评
    async fn scenario() -> Scenario {
        let fx = Fixture::new().await;
        let human = fx
            .storage
            .create_peer_review(NewPeerReview::human(fx.submission.id, fx.reviewer.id))
            .await
            .unwrap();
        let ai = fx
            .storage
            .deposit_ai_review(
                NewPeerReview::ai_generated(fx.submission.id, fx.admin.id, "Generated".into()),
                None,
                vec![],
            )
            .await
            .unwrap();
        let carol_submission =
            create_submission(&fx.storage, fx.assignment.id, fx.other_student.id).await;
        let unrelated = fx
            .storage
            .create_peer_review(NewPeerReview::human(carol_submission.id, fx.reviewer.id))
            .await
            .unwrap();

        Scenario {
            human_id: human.id,
            ai_id: ai.review.id,
            unrelated_id: unrelated.id,
            fx,
        }
    }

    #[tokio::test]
    async fn test_owner_sees_everything_with_identities() {
        let s = scenario().await;
        let resp = list_reviews(&s.fx.storage, &s.fx.instructor, s.fx.assignment.id)
            .await
            .unwrap();

        assert!(resp.identities_revealed);
        assert_eq!(resp.items.len(), 3);
        assert!(
            resp.items
                .iter()
                .any(|r| r.reviewer.display_name == "bob display")
        );
    }

    #[tokio::test]
    async fn test_author_sees_own_released_reviews_anonymously() {
        let s = scenario().await;
        let resp = list_reviews(&s.fx.storage, &s.fx.author, s.fx.assignment.id)
            .await
            .unwrap();

        assert!(!resp.identities_revealed);
        let ids: Vec<i64> = resp.items.iter().map(|r| r.review.id).collect();
        assert_eq!(ids, vec![s.human_id]);
        assert_eq!(resp.items[0].reviewer.display_name, ANONYMOUS_REVIEWER);
        assert_eq!(resp.items[0].reviewer.id, None);
    }

    #[tokio::test]
    async fn test_reviewer_sees_reviews_they_write() {
        let s = scenario().await;
        let resp = list_reviews(&s.fx.storage, &s.fx.reviewer, s.fx.assignment.id)
            .await
            .unwrap();

        let mut ids: Vec<i64> = resp.items.iter().map(|r| r.review.id).collect();
        ids.sort();
        assert_eq!(ids, vec![s.human_id, s.unrelated_id]);
    }

    #[tokio::test]
    async fn test_foreign_instructor_sees_nothing() {
        let s = scenario().await;
        let resp = list_reviews(&s.fx.storage, &s.fx.other_instructor, s.fx.assignment.id)
            .await
            .unwrap();
        assert!(resp.items.is_empty());
        assert!(!resp.identities_revealed);
    }

    #[tokio::test]
    async fn test_released_ai_review_becomes_visible() {
        let s = scenario().await;
        s.fx.storage.release_peer_review(s.ai_id).await.unwrap();

        let resp = list_reviews(&s.fx.storage, &s.fx.author, s.fx.assignment.id)
            .await
            .unwrap();
        assert_eq!(resp.items.len(), 2);
    }

    #[tokio::test]
    async fn test_get_hides_unreleased_ai_review() {
        let s = scenario().await;

        let err = get_review(&s.fx.storage, &s.fx.author, s.ai_id)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E006");

        let owner_view = get_review(&s.fx.storage, &s.fx.instructor, s.ai_id)
            .await
            .unwrap();
        assert!(owner_view.review.is_ai_generated);
        assert_eq!(owner_view.reviewer.id, Some(s.fx.admin.id));
    }

    #[tokio::test]
    async fn test_get_rejects_uninvolved_student() {
        let s = scenario().await;
        let err = get_review(&s.fx.storage, &s.fx.other_student, s.human_id)
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), "Forbidden");

        let ok = get_review(&s.fx.storage, &s.fx.author, s.human_id)
            .await
            .unwrap();
        assert_eq!(ok.reviewer.display_name, ANONYMOUS_REVIEWER);
    }

    #[tokio::test]
    async fn test_list_for_missing_assignment() {
        let fx = Fixture::new().await;
        let err = list_reviews(&fx.storage, &fx.author, 404).await.unwrap_err();
        assert_eq!(err.code(), "E006");
    }
}
