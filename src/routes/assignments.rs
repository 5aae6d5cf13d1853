use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares::{self, RequireRole};
use crate::models::courses::requests::{BindRubricRequest, CreateSubmissionRequest};
use crate::models::users::entities::UserRole;
use crate::services::{CourseService, PeerReviewService};

static PEER_REVIEW_SERVICE: Lazy<PeerReviewService> = Lazy::new(PeerReviewService::new_lazy);
static COURSE_SERVICE: Lazy<CourseService> = Lazy::new(CourseService::new_lazy);

pub async fn list_peer_reviews(
    req: HttpRequest,
    assignment_id: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    PEER_REVIEW_SERVICE
        .list_for_assignment(&req, assignment_id.into_inner())
        .await
}

pub async fn release_peer_reviews(
    req: HttpRequest,
    assignment_id: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    PEER_REVIEW_SERVICE
        .release_assignment(&req, assignment_id.into_inner())
        .await
}

pub async fn count_unreleased(
    req: HttpRequest,
    assignment_id: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    PEER_REVIEW_SERVICE
        .count_unreleased(&req, assignment_id.into_inner())
        .await
}

pub async fn create_submission(
    req: HttpRequest,
    assignment_id: web::Path<i64>,
    body: web::Json<CreateSubmissionRequest>,
) -> ActixResult<HttpResponse> {
    COURSE_SERVICE
        .create_submission(&req, assignment_id.into_inner(), body.into_inner())
        .await
}

pub async fn bind_rubric(
    req: HttpRequest,
    assignment_id: web::Path<i64>,
    body: web::Json<BindRubricRequest>,
) -> ActixResult<HttpResponse> {
    COURSE_SERVICE
        .bind_rubric(&req, assignment_id.into_inner(), body.into_inner())
        .await
}

// 配置路由
pub fn configure_assignment_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/assignments")
            .wrap(middlewares::RequireJWT)
            .route("/{id}/peer-reviews", web::get().to(list_peer_reviews))
            .service(
                web::resource("/{id}/peer-reviews/release")
                    .wrap(RequireRole::new_any(UserRole::instructor_roles()))
                    .route(web::post().to(release_peer_reviews)),
            )
            .service(
                web::resource("/{id}/peer-reviews/unreleased-count")
                    .wrap(RequireRole::new_any(UserRole::instructor_roles()))
                    .route(web::get().to(count_unreleased)),
            )
            .service(
                web::resource("/{id}/submissions")
                    .wrap(RequireRole::new(&UserRole::Student))
                    .route(web::post().to(create_submission)),
            )
            .service(
                web::resource("/{id}/rubric")
                    .wrap(RequireRole::new_any(UserRole::instructor_roles()))
                    .route(web::put().to(bind_rubric)),
            ),
    );
}
