use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares::{self, RequireRole};
use crate::models::peer_reviews::requests::{
    AssignReviewRequest, DepositAiReviewRequest, RecordScoresRequest, SetReviewStatusRequest,
};
use crate::models::users::entities::UserRole;
use crate::services::PeerReviewService;

// 懒加载的全局 PeerReviewService 实例
static PEER_REVIEW_SERVICE: Lazy<PeerReviewService> = Lazy::new(PeerReviewService::new_lazy);

pub async fn assign_review(
    req: HttpRequest,
    body: web::Json<AssignReviewRequest>,
) -> ActixResult<HttpResponse> {
    PEER_REVIEW_SERVICE.assign(&req, body.into_inner()).await
}

pub async fn get_review(req: HttpRequest, review_id: web::Path<i64>) -> ActixResult<HttpResponse> {
    PEER_REVIEW_SERVICE.get(&req, review_id.into_inner()).await
}

pub async fn delete_review(
    req: HttpRequest,
    review_id: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    PEER_REVIEW_SERVICE.delete(&req, review_id.into_inner()).await
}

pub async fn set_review_status(
    req: HttpRequest,
    review_id: web::Path<i64>,
    body: web::Json<SetReviewStatusRequest>,
) -> ActixResult<HttpResponse> {
    PEER_REVIEW_SERVICE
        .set_status(&req, review_id.into_inner(), body.into_inner())
        .await
}

pub async fn record_scores(
    req: HttpRequest,
    review_id: web::Path<i64>,
    body: web::Json<RecordScoresRequest>,
) -> ActixResult<HttpResponse> {
    PEER_REVIEW_SERVICE
        .record_scores(&req, review_id.into_inner(), body.into_inner())
        .await
}

pub async fn release_review(
    req: HttpRequest,
    review_id: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    PEER_REVIEW_SERVICE
        .release(&req, review_id.into_inner())
        .await
}

pub async fn deposit_ai_review(
    req: HttpRequest,
    submission_id: web::Path<i64>,
    body: web::Json<DepositAiReviewRequest>,
) -> ActixResult<HttpResponse> {
    PEER_REVIEW_SERVICE
        .deposit_ai_review(&req, submission_id.into_inner(), body.into_inner())
        .await
}

// 配置路由
pub fn configure_peer_review_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/peer-reviews")
            .wrap(middlewares::RequireJWT)
            .service(
                web::resource("")
                    .wrap(RequireRole::new_any(UserRole::instructor_roles()))
                    .route(web::post().to(assign_review)),
            )
            .service(
                web::resource("/{id}")
                    .route(web::get().to(get_review))
                    // 删除由归属校验限定为课程教师或管理员
                    .route(web::delete().to(delete_review)),
            )
            .route("/{id}/status", web::put().to(set_review_status))
            .route("/{id}/scores", web::put().to(record_scores))
            .service(
                web::resource("/{id}/release")
                    .wrap(RequireRole::new_any(UserRole::instructor_roles()))
                    .route(web::post().to(release_review)),
            ),
    );

    // AI 评审由管理员服务账号写入
    cfg.service(
        web::scope("/api/v1/submissions")
            .wrap(middlewares::RequireJWT)
            .service(
                web::resource("/{id}/ai-reviews")
                    .wrap(RequireRole::new(&UserRole::Admin))
                    .route(web::post().to(deposit_ai_review)),
            ),
    );
}
