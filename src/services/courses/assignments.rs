use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use super::CourseService;
use crate::errors::{PeerReviewError, Result};
use crate::models::ApiResponse;
use crate::models::courses::{
    entities::Assignment,
    requests::{BindRubricRequest, CreateAssignmentRequest},
};
use crate::models::users::entities::User;
use crate::services::current_user;
use crate::services::ownership::{OwnedResource, OwnershipResolver};
use crate::storage::Storage;

/// 在课程下创建作业，仅课程教师或管理员
pub async fn create_assignment(
    storage: &Arc<dyn Storage>,
    caller: &User,
    course_id: i64,
    req: CreateAssignmentRequest,
) -> Result<Assignment> {
    let course = storage
        .get_course_by_id(course_id)
        .await?
        .ok_or_else(|| PeerReviewError::not_found(format!("Course {course_id} not found")))?;

    if !caller.is_admin() && course.instructor_id != caller.id {
        return Err(PeerReviewError::forbidden(format!(
            "User {} is not the instructor of course {course_id}",
            caller.id
        )));
    }
    if req.title.trim().is_empty() {
        return Err(PeerReviewError::validation(
            "Assignment title must not be empty",
        ));
    }
    if let Some(rubric_id) = req.rubric_id
        && storage.get_rubric_by_id(rubric_id).await?.is_none()
    {
        return Err(PeerReviewError::not_found(format!(
            "Rubric {rubric_id} not found"
        )));
    }

    storage.create_assignment(course_id, req).await
}

/// 绑定或解绑评分量规
///
/// 作业下已有评分时拒绝修改，避免已有分数失去对应的维度。
pub async fn bind_rubric(
    storage: &Arc<dyn Storage>,
    caller: &User,
    assignment_id: i64,
    req: BindRubricRequest,
) -> Result<Assignment> {
    if storage.get_assignment_by_id(assignment_id).await?.is_none() {
        return Err(PeerReviewError::not_found(format!(
            "Assignment {assignment_id} not found"
        )));
    }
    OwnershipResolver::new(storage.as_ref())
        .ensure_owner(caller, OwnedResource::Assignment(assignment_id))
        .await?;

    storage
        .bind_assignment_rubric(assignment_id, req.rubric_id)
        .await
}

pub async fn handle_create_assignment(
    service: &CourseService,
    request: &HttpRequest,
    course_id: i64,
    body: CreateAssignmentRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let result = async {
        let caller = current_user(request)?;
        create_assignment(&storage, &caller, course_id, body).await
    }
    .await;

    Ok(ApiResponse::respond_created(result, "Assignment created"))
}

pub async fn handle_bind_rubric(
    service: &CourseService,
    request: &HttpRequest,
    assignment_id: i64,
    body: BindRubricRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let result = async {
        let caller = current_user(request)?;
        bind_rubric(&storage, &caller, assignment_id, body).await
    }
    .await;

    Ok(ApiResponse::respond(result, "Rubric binding updated"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::peer_reviews::entities::{NewPeerReview, ValidatedScore};
    use crate::storage::test_support::{Fixture, create_rubric};

    fn assignment(rubric_id: Option<i64>) -> CreateAssignmentRequest {
        CreateAssignmentRequest {
            title: "Essay 2".to_string(),
            description: None,
            due_date: None,
            rubric_id,
        }
    }

    #[tokio::test]
    async fn test_only_course_instructor_creates_assignments() {
        let fx = Fixture::new().await;

        let created = create_assignment(&fx.storage, &fx.instructor, fx.course.id, assignment(None))
            .await
            .unwrap();
        assert_eq!(created.course_id, fx.course.id);

        let err = create_assignment(
            &fx.storage,
            &fx.other_instructor,
            fx.course.id,
            assignment(None),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_type(), "Forbidden");

        let err = create_assignment(&fx.storage, &fx.instructor, fx.course.id, assignment(Some(404)))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E006");
    }

    #[tokio::test]
    async fn test_rebinding_refused_once_scores_exist() {
        let fx = Fixture::new().await;
        let replacement = create_rubric(&fx.storage, fx.instructor.id).await;

        let rebound = bind_rubric(
            &fx.storage,
            &fx.instructor,
            fx.assignment.id,
            BindRubricRequest {
                rubric_id: Some(replacement.id),
            },
        )
        .await
        .unwrap();
        assert_eq!(rebound.rubric_id, Some(replacement.id));

        let review = fx
            .storage
            .create_peer_review(NewPeerReview::human(fx.submission.id, fx.reviewer.id))
            .await
            .unwrap();
        fx.storage
            .save_review_scores(
                review.id,
                &replacement,
                vec![ValidatedScore {
                    criterion_id: replacement.criteria[0].id,
                    score: 5.0,
                    feedback: None,
                }],
                None,
            )
            .await
            .unwrap();

        let err = bind_rubric(
            &fx.storage,
            &fx.instructor,
            fx.assignment.id,
            BindRubricRequest { rubric_id: None },
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_type(), "Invalid State");
    }

    #[tokio::test]
    async fn test_bind_by_foreign_instructor() {
        let fx = Fixture::new().await;
        let err = bind_rubric(
            &fx.storage,
            &fx.other_instructor,
            fx.assignment.id,
            BindRubricRequest { rubric_id: None },
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_type(), "Forbidden");
    }
}
