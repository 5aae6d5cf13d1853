use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use super::CourseService;
use crate::errors::{PeerReviewError, Result};
use crate::models::ApiResponse;
use crate::models::courses::{entities::Submission, requests::CreateSubmissionRequest};
use crate::models::users::entities::{User, UserRole};
use crate::services::current_user;
use crate::storage::Storage;

// 学生提交作业，不校验选课关系
pub async fn create_submission(
    storage: &Arc<dyn Storage>,
    caller: &User,
    assignment_id: i64,
    req: CreateSubmissionRequest,
) -> Result<Submission> {
    if caller.role != UserRole::Student {
        return Err(PeerReviewError::forbidden("Only students can submit work"));
    }
    if storage.get_assignment_by_id(assignment_id).await?.is_none() {
        return Err(PeerReviewError::not_found(format!(
            "Assignment {assignment_id} not found"
        )));
    }
    if req.content.trim().is_empty() {
        return Err(PeerReviewError::validation(
            "Submission content must not be empty",
        ));
    }

    storage
        .create_submission(assignment_id, caller.id, req.content)
        .await
}

pub async fn handle_create_submission(
    service: &CourseService,
    request: &HttpRequest,
    assignment_id: i64,
    body: CreateSubmissionRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let result = async {
        let caller = current_user(request)?;
        create_submission(&storage, &caller, assignment_id, body).await
    }
    .await;

    Ok(ApiResponse::respond_created(result, "Submission created"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::Fixture;

    fn content(text: &str) -> CreateSubmissionRequest {
        CreateSubmissionRequest {
            content: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_student_submits() {
        let fx = Fixture::new().await;
        let submission = create_submission(&fx.storage, &fx.other_student, fx.assignment.id, content("Draft"))
            .await
            .unwrap();
        assert_eq!(submission.author_id, fx.other_student.id);
    }

    #[tokio::test]
    async fn test_rejections() {
        let fx = Fixture::new().await;

        let err = create_submission(&fx.storage, &fx.instructor, fx.assignment.id, content("x"))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), "Forbidden");

        let err = create_submission(&fx.storage, &fx.author, 404, content("x"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E006");

        let err = create_submission(&fx.storage, &fx.author, fx.assignment.id, content("  "))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E005");
    }
}
