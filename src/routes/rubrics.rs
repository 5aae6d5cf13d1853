use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares::{self, RequireRole};
use crate::models::rubrics::requests::CreateRubricRequest;
use crate::models::users::entities::UserRole;
use crate::services::RubricService;

static RUBRIC_SERVICE: Lazy<RubricService> = Lazy::new(RubricService::new_lazy);

pub async fn create_rubric(
    req: HttpRequest,
    body: web::Json<CreateRubricRequest>,
) -> ActixResult<HttpResponse> {
    RUBRIC_SERVICE.create_rubric(&req, body.into_inner()).await
}

pub async fn get_rubric(req: HttpRequest, rubric_id: web::Path<i64>) -> ActixResult<HttpResponse> {
    RUBRIC_SERVICE.get_rubric(&req, rubric_id.into_inner()).await
}

// 配置路由
pub fn configure_rubric_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/rubrics")
            .wrap(middlewares::RequireJWT)
            .service(
                web::resource("")
                    .wrap(RequireRole::new_any(UserRole::instructor_roles()))
                    .route(web::post().to(create_rubric)),
            )
            .route("/{id}", web::get().to(get_rubric)),
    );
}
