use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares::{self, RequireRole};
use crate::models::courses::requests::{CreateAssignmentRequest, CreateCourseRequest};
use crate::models::users::entities::UserRole;
use crate::services::CourseService;

static COURSE_SERVICE: Lazy<CourseService> = Lazy::new(CourseService::new_lazy);

pub async fn create_course(
    req: HttpRequest,
    body: web::Json<CreateCourseRequest>,
) -> ActixResult<HttpResponse> {
    COURSE_SERVICE.create_course(&req, body.into_inner()).await
}

pub async fn create_assignment(
    req: HttpRequest,
    course_id: web::Path<i64>,
    body: web::Json<CreateAssignmentRequest>,
) -> ActixResult<HttpResponse> {
    COURSE_SERVICE
        .create_assignment(&req, course_id.into_inner(), body.into_inner())
        .await
}

// 配置路由
pub fn configure_course_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/courses")
            .wrap(RequireRole::new_any(UserRole::instructor_roles()))
            .wrap(middlewares::RequireJWT)
            .route("", web::post().to(create_course))
            .route("/{id}/assignments", web::post().to(create_assignment)),
    );
}
