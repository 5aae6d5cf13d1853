use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use tracing::info;

use super::CourseService;
use crate::errors::{PeerReviewError, Result};
use crate::models::ApiResponse;
use crate::models::courses::{entities::Course, requests::CreateCourseRequest};
use crate::models::users::entities::{User, UserRole};
use crate::services::current_user;
use crate::storage::Storage;

/// 创建课程
///
/// 教师创建的课程归自己所有；管理员必须通过 `instructor_id` 指定一名教师。
pub async fn create_course(
    storage: &Arc<dyn Storage>,
    caller: &User,
    req: CreateCourseRequest,
) -> Result<Course> {
    if req.name.trim().is_empty() {
        return Err(PeerReviewError::validation("Course name must not be empty"));
    }

    let instructor_id = match caller.role {
        UserRole::Instructor => caller.id,
        UserRole::Admin => {
            let id = req.instructor_id.ok_or_else(|| {
                PeerReviewError::validation("instructor_id is required when an admin creates a course")
            })?;
            let instructor = storage
                .get_user_by_id(id)
                .await?
                .ok_or_else(|| PeerReviewError::not_found(format!("User {id} not found")))?;
            if instructor.role != UserRole::Instructor {
                return Err(PeerReviewError::validation(format!(
                    "User {id} is not an instructor"
                )));
            }
            id
        }
        UserRole::Student => {
            return Err(PeerReviewError::forbidden("Students cannot create courses"));
        }
    };

    let course = storage.create_course(instructor_id, req).await?;
    info!("Course {} created for instructor {}", course.id, instructor_id);
    Ok(course)
}

pub async fn handle_create_course(
    service: &CourseService,
    request: &HttpRequest,
    body: CreateCourseRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);
    let result = async {
        let caller = current_user(request)?;
        create_course(&storage, &caller, body).await
    }
    .await;

    Ok(ApiResponse::respond_created(result, "Course created"))
}
