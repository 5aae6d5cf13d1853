use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::collections::HashSet;
use std::sync::Arc;

use super::PeerReviewService;
use crate::errors::{PeerReviewError, Result};
use crate::models::ApiResponse;
use crate::models::peer_reviews::{
    entities::{ReviewStatus, ValidatedScore},
    requests::{RecordScoresRequest, ScoreEntry},
    responses::PeerReviewResponse,
};
use crate::models::rubrics::entities::Rubric;
use crate::models::users::entities::User;
use crate::services::current_user;
use crate::services::ownership::{OwnedResource, OwnershipResolver};
use crate::storage::Storage;

/// 校验一组评分，全部通过才返回
///
/// - 同一维度出现多次：`Validation`
/// - 维度不属于量规：`CriterionMismatch`
/// - 分数不在 `[0, max_points]` 或非有限值：`ScoreOutOfRange`
pub fn validate_entries(rubric: &Rubric, entries: Vec<ScoreEntry>) -> Result<Vec<ValidatedScore>> {
    let mut seen = HashSet::with_capacity(entries.len());
    let mut validated = Vec::with_capacity(entries.len());

    for entry in entries {
        if !seen.insert(entry.criterion_id) {
            return Err(PeerReviewError::validation(format!(
                "Criterion {} appears more than once",
                entry.criterion_id
            )));
        }

        let criterion = rubric.criterion(entry.criterion_id).ok_or_else(|| {
            PeerReviewError::criterion_mismatch(format!(
                "Criterion {} does not belong to rubric '{}'",
                entry.criterion_id, rubric.title
            ))
        })?;

        if !criterion.accepts(entry.score) {
            return Err(PeerReviewError::score_out_of_range(format!(
                "Score {} for criterion '{}' is outside [0, {}]",
                entry.score, criterion.name, criterion.max_points
            )));
        }

        validated.push(ValidatedScore {
            criterion_id: entry.criterion_id,
            score: entry.score,
            feedback: entry.feedback,
        });
    }

    Ok(validated)
}

/// 提交所属作业绑定的量规
pub(crate) async fn rubric_for_submission(
    storage: &Arc<dyn Storage>,
    submission_id: i64,
) -> Result<Option<Rubric>> {
    let Some(submission) = storage.get_submission_by_id(submission_id).await? else {
        return Ok(None);
    };
    let Some(rubric_id) = storage
        .get_assignment_by_id(submission.assignment_id)
        .await?
        .and_then(|a| a.rubric_id)
    else {
        return Ok(None);
    };
    storage.get_rubric_by_id(rubric_id).await
}

/// 记录评分并重算总分
///
/// 所有校验在写入前完成；写入与总分重算在存储层同一事务内进行。
pub async fn record_scores(
    storage: &Arc<dyn Storage>,
    caller: &User,
    review_id: i64,
    req: RecordScoresRequest,
) -> Result<PeerReviewResponse> {
    let detail = storage
        .get_peer_review(review_id)
        .await?
        .ok_or_else(|| PeerReviewError::not_found(format!("Peer review {review_id} not found")))?;

    let is_owner = OwnershipResolver::new(storage.as_ref())
        .is_owner(caller, OwnedResource::Review(review_id))
        .await?;
    if !is_owner && detail.review.reviewer_id != caller.id {
        return Err(PeerReviewError::forbidden(
            "Only the assigned reviewer or the course instructor can score this review",
        ));
    }

    if detail.review.status == ReviewStatus::Completed {
        return Err(PeerReviewError::invalid_state(format!(
            "Peer review {review_id} is completed, scores can no longer change"
        )));
    }

    if req.scores.is_empty() && req.overall_feedback.is_none() {
        return Err(PeerReviewError::validation(
            "Nothing to record: provide scores or overall feedback",
        ));
    }

    let rubric = rubric_for_submission(storage, detail.review.submission_id)
        .await?
        .ok_or_else(|| {
            PeerReviewError::criterion_mismatch(
                "The assignment of this review has no rubric bound",
            )
        })?;
    let scores = validate_entries(&rubric, req.scores)?;

    let saved = storage
        .save_review_scores(review_id, &rubric, scores, req.overall_feedback)
        .await?;

    Ok(PeerReviewResponse::from_detail(saved, is_owner))
}

pub async fn handle_record_scores(
    service: &PeerReviewService,
    request: &HttpRequest,
    review_id: i64,
    body: RecordScoresRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let result = async {
        let caller = current_user(request)?;
        record_scores(&storage, &caller, review_id, body).await
    }
    .await;

    Ok(ApiResponse::respond(result, "Scores recorded"))
}
