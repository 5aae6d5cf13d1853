use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use tracing::info;

use super::PeerReviewService;
use crate::errors::{PeerReviewError, Result};
use crate::models::ApiResponse;
use crate::models::peer_reviews::entities::ReviewStatus;
use crate::models::users::entities::User;
use crate::services::current_user;
use crate::services::ownership::{OwnedResource, OwnershipResolver};
use crate::storage::Storage;

/// 删除尚未完成的互评，评分一并删除
pub async fn delete_review(storage: &Arc<dyn Storage>, caller: &User, review_id: i64) -> Result<()> {
    let detail = storage
        .get_peer_review(review_id)
        .await?
        .ok_or_else(|| PeerReviewError::not_found(format!("Peer review {review_id} not found")))?;

    OwnershipResolver::new(storage.as_ref())
        .ensure_owner(caller, OwnedResource::Review(review_id))
        .await?;

    if detail.review.status == ReviewStatus::Completed {
        return Err(PeerReviewError::invalid_state(format!(
            "Peer review {review_id} is completed and cannot be deleted"
        )));
    }

    if storage.delete_unfinished_peer_review(review_id).await? {
        info!("Peer review {} deleted by user {}", review_id, caller.id);
        return Ok(());
    }

    // 条件删除未命中：期间被删除或被完成
    match storage.get_peer_review(review_id).await? {
        None => Err(PeerReviewError::not_found(format!(
            "Peer review {review_id} not found"
        ))),
        Some(_) => Err(PeerReviewError::invalid_state(format!(
            "Peer review {review_id} was completed concurrently and cannot be deleted"
        ))),
    }
}

pub async fn handle_delete(
    service: &PeerReviewService,
    request: &HttpRequest,
    review_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let result = async {
        let caller = current_user(request)?;
        delete_review(&storage, &caller, review_id).await
    }
    .await;

    Ok(ApiResponse::respond(result, "Peer review deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::peer_reviews::entities::NewPeerReview;
    use crate::storage::test_support::Fixture;

    async fn assigned(fx: &Fixture) -> i64 {
        fx.storage
            .create_peer_review(NewPeerReview::human(fx.submission.id, fx.reviewer.id))
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_delete_before_completion() {
        let fx = Fixture::new().await;
        let id = assigned(&fx).await;

        delete_review(&fx.storage, &fx.instructor, id).await.unwrap();

        assert!(fx.storage.get_peer_review(id).await.unwrap().is_none());
        let err = delete_review(&fx.storage, &fx.instructor, id)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E006");
    }

    #[tokio::test]
    async fn test_delete_after_completion_is_rejected() {
        let fx = Fixture::new().await;
        let id = assigned(&fx).await;
        fx.storage
            .update_peer_review_status(id, ReviewStatus::Completed)
            .await
            .unwrap();

        let err = delete_review(&fx.storage, &fx.instructor, id)
            .await
            .unwrap_err();

        assert_eq!(err.error_type(), "Invalid State");
        assert!(fx.storage.get_peer_review(id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_by_foreign_instructor_or_student() {
        let fx = Fixture::new().await;
        let id = assigned(&fx).await;

        for caller in [&fx.other_instructor, &fx.reviewer] {
            let err = delete_review(&fx.storage, caller, id).await.unwrap_err();
            assert_eq!(err.error_type(), "Forbidden");
        }
        assert!(fx.storage.get_peer_review(id).await.unwrap().is_some());
    }
}
