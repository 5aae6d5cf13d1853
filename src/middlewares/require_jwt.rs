/*!
 * JWT 认证中间件
 *
 * 验证 `Authorization: Bearer <token>`，通过后从存储层加载用户并放入请求扩展。
 * 每次请求都会重新读取用户，停用的账号立即失去访问权限。
 *
 * ```rust,ignore
 * web::scope("/api/v1/peer-reviews")
 *     .wrap(RequireJWT)
 *     .route("/{id}", web::get().to(get_peer_review))
 * ```
 *
 * 处理程序中通过 `RequireJWT::extract_user_claims(&req)` 取得当前用户。
 */

use crate::models::ErrorCode;
use crate::models::users::entities::{User, UserStatus};
use crate::storage::Storage;
use crate::utils::jwt::JwtUtils;
use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage, HttpRequest,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::{StatusCode, header::AUTHORIZATION},
    web,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::{rc::Rc, sync::Arc};
use tracing::{debug, error, info};

use super::create_error_response;

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Clone)]
pub struct RequireJWT;

/// 认证失败的原因
#[derive(Debug, PartialEq)]
enum Rejection {
    MissingToken,
    InvalidToken,
    UnknownUser,
    Suspended,
    StoreUnavailable,
}

impl Rejection {
    fn status(&self) -> StatusCode {
        match self {
            Rejection::StoreUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    fn code(&self) -> ErrorCode {
        match self {
            Rejection::StoreUnavailable => ErrorCode::TransactionFailure,
            _ => ErrorCode::Unauthorized,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            Rejection::MissingToken => "Missing or malformed Authorization header",
            Rejection::InvalidToken => "Invalid or expired access token",
            Rejection::UnknownUser => "User no longer exists",
            Rejection::Suspended => "User account is suspended",
            Rejection::StoreUnavailable => "Storage operation failed, please retry later",
        }
    }
}

fn bearer_token(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|h| h.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

// 验证 access token 并加载当前用户
async fn authenticate(req: &ServiceRequest) -> Result<User, Rejection> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());
    let token = bearer_token(header).ok_or(Rejection::MissingToken)?;

    let user_id = JwtUtils::verify_access_token(token)
        .map_err(|err| {
            debug!("Access token rejected: {}", err);
            Rejection::InvalidToken
        })?
        .user_id()
        .ok_or(Rejection::InvalidToken)?;

    let storage = req
        .app_data::<web::Data<Arc<dyn Storage>>>()
        .ok_or(Rejection::StoreUnavailable)?
        .get_ref()
        .clone();

    let user = storage
        .get_user_by_id(user_id)
        .await
        .map_err(|e| {
            error!("Failed to load user {} for authentication: {}", user_id, e);
            Rejection::StoreUnavailable
        })?
        .ok_or(Rejection::UnknownUser)?;

    if user.status != UserStatus::Active {
        return Err(Rejection::Suspended);
    }

    Ok(user)
}

impl<S, B> Transform<S, ServiceRequest> for RequireJWT
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireJWTMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireJWTMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct RequireJWTMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequireJWTMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        Box::pin(async move {
            // 预检请求直接放行
            if req.method() == actix_web::http::Method::OPTIONS {
                return Ok(req.into_response(
                    create_error_response(StatusCode::NO_CONTENT, ErrorCode::Success, "")
                        .map_into_right_body(),
                ));
            }

            match authenticate(&req).await {
                Ok(user) => {
                    debug!("Authenticated user {} for {}", user.id, req.path());
                    req.extensions_mut().insert(user);
                    let res = srv.call(req).await?.map_into_left_body();
                    Ok(res)
                }
                Err(rejection) => {
                    info!("Authentication failed for {}: {:?}", req.path(), rejection);
                    Ok(req.into_response(
                        create_error_response(
                            rejection.status(),
                            rejection.code(),
                            rejection.message(),
                        )
                        .map_into_right_body(),
                    ))
                }
            }
        })
    }
}

impl RequireJWT {
    /// 当前用户，路由未挂载本中间件时为 None
    pub fn extract_user_claims(req: &HttpRequest) -> Option<User> {
        req.extensions().get::<User>().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(Some("Bearer   ")), None);
        assert_eq!(bearer_token(Some("Basic abc")), None);
        assert_eq!(bearer_token(None), None);
    }

    #[test]
    fn test_store_failure_is_not_an_auth_failure() {
        assert_eq!(
            Rejection::StoreUnavailable.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(Rejection::Suspended.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(Rejection::InvalidToken.code(), ErrorCode::Unauthorized);
    }
}
