pub mod login;
pub mod profile;
pub mod register;
pub mod verify;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::models::auth::{LoginRequest, RegisterRequest, VerifyEmailRequest};
use crate::services::notifier::Notifier;
use crate::storage::Storage;

pub struct AuthService {
    storage: Option<Arc<dyn Storage>>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl AuthService {
    pub fn new_lazy() -> Self {
        Self {
            storage: None,
            notifier: None,
        }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> Arc<dyn Storage> {
        match &self.storage {
            Some(storage) => storage.clone(),
            None => super::shared::<dyn Storage>(request),
        }
    }

    pub(crate) fn get_notifier(&self, request: &HttpRequest) -> Arc<dyn Notifier> {
        match &self.notifier {
            Some(notifier) => notifier.clone(),
            None => super::shared::<dyn Notifier>(request),
        }
    }

    pub(crate) fn get_config(&self) -> &AppConfig {
        AppConfig::get()
    }

    // 登录验证
    pub async fn login(
        &self,
        login_request: LoginRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        login::handle_login(self, login_request, request).await
    }

    // 用户注册，账号在邮箱验证后创建
    pub async fn register(
        &self,
        register_request: RegisterRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        register::handle_register(self, register_request, request).await
    }

    // 邮箱验证
    pub async fn verify_email(
        &self,
        verify_request: VerifyEmailRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        verify::handle_verify_email(self, verify_request, request).await
    }

    // 获取当前用户信息
    pub async fn get_user(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        profile::handle_get_user(self, request).await
    }
}
