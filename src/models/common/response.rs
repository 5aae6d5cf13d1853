use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::errors::Result;
use crate::models::ErrorCode;

// 统一的API响应结构
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/api.ts")]
pub struct ApiResponse<T: TS> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<T: TS> ApiResponse<T> {
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Success as i32,
            message: message.into(),
            data: Some(data),
            timestamp: chrono::Utc::now(),
        }
    }
}

impl<T: TS + Serialize> ApiResponse<T> {
    /// 将服务层结果转换为 HTTP 响应，错误统一交给 `PeerReviewError::to_response`
    pub fn respond(result: Result<T>, message: impl Into<String>) -> HttpResponse {
        match result {
            Ok(data) => HttpResponse::Ok().json(Self::success(data, message)),
            Err(e) => e.to_response(),
        }
    }

    /// 同 `respond`，成功时返回 201
    pub fn respond_created(result: Result<T>, message: impl Into<String>) -> HttpResponse {
        match result {
            Ok(data) => HttpResponse::Created().json(Self::success(data, message)),
            Err(e) => e.to_response(),
        }
    }
}

impl ApiResponse<()> {
    pub fn success_empty(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Success as i32,
            message: message.into(),
            data: None,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn error_empty(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code as i32,
            message: message.into(),
            data: None,
            timestamp: chrono::Utc::now(),
        }
    }
}
