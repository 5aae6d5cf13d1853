use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use tracing::{info, warn};

use super::PeerReviewService;
use crate::errors::{PeerReviewError, Result};
use crate::models::ApiResponse;
use crate::models::peer_reviews::{
    entities::{PeerReviewDetail, ReviewStatus},
    requests::SetReviewStatusRequest,
    responses::PeerReviewResponse,
};
use crate::models::users::entities::User;
use crate::services::current_user;
use crate::services::ownership::{OwnedResource, OwnershipResolver};
use crate::storage::Storage;

/// 更新互评状态
///
/// 评审人、课程教师与管理员可以推进状态；离开 completed 视为重新打开，
/// 只允许课程教师或管理员操作。完成时间由存储层按迁移推导。
pub async fn set_review_status(
    storage: &Arc<dyn Storage>,
    caller: &User,
    review_id: i64,
    req: SetReviewStatusRequest,
) -> Result<PeerReviewResponse> {
    let next: ReviewStatus = req.status.trim().parse()?;

    let detail = storage
        .get_peer_review(review_id)
        .await?
        .ok_or_else(|| PeerReviewError::not_found(format!("Peer review {review_id} not found")))?;

    let is_owner = OwnershipResolver::new(storage.as_ref())
        .is_owner(caller, OwnedResource::Review(review_id))
        .await?;
    let is_reviewer = detail.review.reviewer_id == caller.id;
    if !is_owner && !is_reviewer {
        return Err(PeerReviewError::forbidden(
            "Only the assigned reviewer or the course instructor can change this review",
        ));
    }

    let current = detail.review.status;
    if current.is_terminal() && !next.is_terminal() {
        if !is_owner {
            return Err(PeerReviewError::forbidden(
                "Only the course instructor can reopen a completed review",
            ));
        }
        warn!(
            "Peer review {} reopened by user {}: {} -> {}",
            review_id, caller.id, current, next
        );
    }

    let review = storage
        .update_peer_review_status(review_id, next)
        .await?
        .ok_or_else(|| PeerReviewError::not_found(format!("Peer review {review_id} not found")))?;
    info!("Peer review {} status {} -> {}", review_id, current, next);

    Ok(PeerReviewResponse::from_detail(
        PeerReviewDetail { review, ..detail },
        is_owner,
    ))
}

pub async fn handle_set_status(
    service: &PeerReviewService,
    request: &HttpRequest,
    review_id: i64,
    body: SetReviewStatusRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let result = async {
        let caller = current_user(request)?;
        set_review_status(&storage, &caller, review_id, body).await
    }
    .await;

    Ok(ApiResponse::respond(result, "Peer review status updated"))
}
