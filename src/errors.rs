//! 统一错误处理模块
//!
//! 使用宏自动生成错误类型，支持错误代码和类型名称。
//! 存储层错误只在日志中保留细节，对调用方统一表现为 `TransactionFailure`。

use std::fmt;

use actix_web::HttpResponse;
use actix_web::http::StatusCode;

use crate::models::{ApiResponse, ErrorCode};

/// 定义错误类型的宏
///
/// 自动生成：
/// - enum 定义
/// - code() 方法 - 返回错误代码
/// - error_type() 方法 - 返回错误类型名称
/// - message() 方法 - 返回错误详情
/// - 便捷构造函数
macro_rules! define_peer_review_errors {
    ($(
        $variant:ident($code:literal, $type_name:literal)
    ),* $(,)?) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum PeerReviewError {
            $($variant(String),)*
        }

        impl PeerReviewError {
            /// 获取错误代码
            pub fn code(&self) -> &'static str {
                match self {
                    $(PeerReviewError::$variant(_) => $code,)*
                }
            }

            /// 获取错误类型名称
            pub fn error_type(&self) -> &'static str {
                match self {
                    $(PeerReviewError::$variant(_) => $type_name,)*
                }
            }

            /// 获取错误详情
            pub fn message(&self) -> &str {
                match self {
                    $(PeerReviewError::$variant(msg) => msg,)*
                }
            }
        }

        // 生成便捷构造函数
        paste::paste! {
            impl PeerReviewError {
                $(
                    pub fn [<$variant:snake>]<T: Into<String>>(msg: T) -> Self {
                        PeerReviewError::$variant(msg.into())
                    }
                )*
            }
        }
    };
}

define_peer_review_errors! {
    DatabaseConfig("E001", "Database Configuration Error"),
    DatabaseConnection("E002", "Database Connection Error"),
    DatabaseOperation("E003", "Database Operation Error"),
    Serialization("E004", "Serialization Error"),
    Validation("E005", "Validation Error"),
    NotFound("E006", "Resource Not Found"),
    Authentication("E007", "Authentication Error"),
    Forbidden("E008", "Forbidden"),
    InvalidState("E009", "Invalid State"),
    InvalidStatus("E010", "Invalid Status"),
    ScoreOutOfRange("E011", "Score Out Of Range"),
    CriterionMismatch("E012", "Criterion Mismatch"),
    DuplicateAssignment("E013", "Duplicate Assignment"),
    SelfReviewForbidden("E014", "Self Review Forbidden"),
    AlreadyReleased("E015", "Already Released"),
    NotApplicable("E016", "Not Applicable"),
    TransactionFailure("E017", "Transaction Failure"),
    Conflict("E018", "Conflict"),
}

impl PeerReviewError {
    /// 格式化为彩色输出（用于开发环境）
    #[cfg(debug_assertions)]
    pub fn format_colored(&self) -> String {
        format!(
            "\x1b[1;31m[ERROR]\x1b[0m \x1b[33m{}\x1b[0m \x1b[31m{}\x1b[0m\n  {}",
            self.code(),
            self.error_type(),
            self.message()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }

    /// 连接类错误，可在本地重试
    pub fn is_transient(&self) -> bool {
        matches!(self, PeerReviewError::DatabaseConnection(_))
    }

    /// 存储层内部错误，不向调用方暴露细节
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            PeerReviewError::DatabaseConfig(_)
                | PeerReviewError::DatabaseConnection(_)
                | PeerReviewError::DatabaseOperation(_)
                | PeerReviewError::Serialization(_)
                | PeerReviewError::TransactionFailure(_)
        )
    }

    /// 对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            PeerReviewError::Validation(_)
            | PeerReviewError::InvalidStatus(_)
            | PeerReviewError::ScoreOutOfRange(_)
            | PeerReviewError::CriterionMismatch(_) => StatusCode::BAD_REQUEST,
            PeerReviewError::Authentication(_) => StatusCode::UNAUTHORIZED,
            PeerReviewError::Forbidden(_) => StatusCode::FORBIDDEN,
            PeerReviewError::NotFound(_) => StatusCode::NOT_FOUND,
            PeerReviewError::InvalidState(_)
            | PeerReviewError::DuplicateAssignment(_)
            | PeerReviewError::SelfReviewForbidden(_)
            | PeerReviewError::AlreadyReleased(_)
            | PeerReviewError::NotApplicable(_)
            | PeerReviewError::Conflict(_) => StatusCode::CONFLICT,
            PeerReviewError::DatabaseConfig(_)
            | PeerReviewError::DatabaseConnection(_)
            | PeerReviewError::DatabaseOperation(_)
            | PeerReviewError::Serialization(_)
            | PeerReviewError::TransactionFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 对应的 API 业务错误码
    pub fn error_code(&self) -> ErrorCode {
        match self {
            PeerReviewError::Validation(_) => ErrorCode::BadRequest,
            PeerReviewError::NotFound(_) => ErrorCode::NotFound,
            PeerReviewError::Authentication(_) => ErrorCode::Unauthorized,
            PeerReviewError::Forbidden(_) => ErrorCode::Forbidden,
            PeerReviewError::InvalidState(_) => ErrorCode::PeerReviewInvalidState,
            PeerReviewError::InvalidStatus(_) => ErrorCode::PeerReviewInvalidStatus,
            PeerReviewError::ScoreOutOfRange(_) => ErrorCode::ScoreOutOfRange,
            PeerReviewError::CriterionMismatch(_) => ErrorCode::CriterionMismatch,
            PeerReviewError::DuplicateAssignment(_) => ErrorCode::PeerReviewDuplicate,
            PeerReviewError::SelfReviewForbidden(_) => ErrorCode::PeerReviewSelfReview,
            PeerReviewError::AlreadyReleased(_) => ErrorCode::ReviewAlreadyReleased,
            PeerReviewError::NotApplicable(_) => ErrorCode::ReleaseNotApplicable,
            PeerReviewError::Conflict(_) => ErrorCode::Conflict,
            PeerReviewError::DatabaseConfig(_)
            | PeerReviewError::DatabaseConnection(_)
            | PeerReviewError::DatabaseOperation(_)
            | PeerReviewError::Serialization(_)
            | PeerReviewError::TransactionFailure(_) => ErrorCode::TransactionFailure,
        }
    }

    /// 转换为 HTTP 响应
    ///
    /// 存储层错误记录完整信息后只返回通用的 `TransactionFailure`。
    pub fn to_response(&self) -> HttpResponse {
        let message = if self.is_store_failure() {
            tracing::error!("{}", self.format_simple());
            "Storage operation failed, please retry later".to_string()
        } else {
            self.message().to_string()
        };

        HttpResponse::build(self.status_code())
            .json(ApiResponse::error_empty(self.error_code(), message))
    }
}

impl fmt::Display for PeerReviewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for PeerReviewError {}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for PeerReviewError {
    fn from(err: sea_orm::DbErr) -> Self {
        match err {
            sea_orm::DbErr::ConnectionAcquire(_) | sea_orm::DbErr::Conn(_) => {
                PeerReviewError::DatabaseConnection(err.to_string())
            }
            _ => PeerReviewError::DatabaseOperation(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for PeerReviewError {
    fn from(err: serde_json::Error) -> Self {
        PeerReviewError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PeerReviewError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(PeerReviewError::database_config("test").code(), "E001");
        assert_eq!(PeerReviewError::validation("test").code(), "E005");
        assert_eq!(PeerReviewError::self_review_forbidden("test").code(), "E014");
        assert_eq!(PeerReviewError::transaction_failure("test").code(), "E017");
    }

    #[test]
    fn test_error_types() {
        assert_eq!(
            PeerReviewError::already_released("test").error_type(),
            "Already Released"
        );
        assert_eq!(
            PeerReviewError::score_out_of_range("test").error_type(),
            "Score Out Of Range"
        );
    }

    #[test]
    fn test_error_message() {
        let err = PeerReviewError::criterion_mismatch("criterion 7 is not part of rubric 2");
        assert_eq!(err.message(), "criterion 7 is not part of rubric 2");
    }

    #[test]
    fn test_format_simple() {
        let err = PeerReviewError::invalid_status("unknown status: done");
        let formatted = err.format_simple();
        assert!(formatted.contains("Invalid Status"));
        assert!(formatted.contains("unknown status: done"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            PeerReviewError::forbidden("x").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            PeerReviewError::duplicate_assignment("x").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            PeerReviewError::score_out_of_range("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PeerReviewError::database_operation("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_store_failures_are_hidden() {
        let err = PeerReviewError::database_operation("UNIQUE constraint failed: users.email");
        assert!(err.is_store_failure());
        assert_eq!(err.error_code() as i32, ErrorCode::TransactionFailure as i32);
        assert!(!PeerReviewError::not_found("x").is_store_failure());
    }

    #[test]
    fn test_transient_errors() {
        assert!(PeerReviewError::database_connection("pool timed out").is_transient());
        assert!(!PeerReviewError::database_operation("syntax error").is_transient());
    }
}
