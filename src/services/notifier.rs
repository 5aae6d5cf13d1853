//! 通知投递
//!
//! 实际的邮件/站内信投递不在本服务内，这里只定义发送接口。
//! 业务操作在主流程提交后再发通知，发送失败只记录日志，不影响已完成的操作。

use std::fmt;

use serde_json::Value;
use tracing::{info, warn};

use crate::errors::Result;

pub const TEMPLATE_VERIFY_EMAIL: &str = "verify_email";
pub const TEMPLATE_REVIEW_ASSIGNED: &str = "peer_review_assigned";
pub const TEMPLATE_REVIEW_RELEASED: &str = "peer_review_released";
pub const TEMPLATE_AI_REVIEW_PENDING: &str = "ai_review_pending_release";

/// 通知接收方：已注册用户，或尚未创建账号的邮箱
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    User(i64),
    Email(String),
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recipient::User(id) => write!(f, "user:{id}"),
            Recipient::Email(email) => write!(f, "email:{email}"),
        }
    }
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: Recipient, template: &str, data: Value) -> Result<()>;
}

/// 只写日志的通知器，作为默认实现
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, recipient: Recipient, template: &str, data: Value) -> Result<()> {
        info!(%recipient, template, %data, "notification queued");
        Ok(())
    }
}

/// 发送通知，失败只记录警告
pub async fn notify_best_effort(
    notifier: &dyn Notifier,
    recipient: Recipient,
    template: &str,
    data: Value,
) {
    let target = recipient.to_string();
    if let Err(e) = notifier.send(recipient, template, data).await {
        warn!("通知 {} 发送给 {} 失败: {}", template, target, e.format_simple());
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use std::sync::Mutex;

    use super::*;
    use crate::errors::PeerReviewError;

    #[derive(Debug, Clone)]
    pub(crate) struct SentNotification {
        pub recipient: Recipient,
        pub template: String,
        pub data: Value,
    }

    /// 记录所有发送请求的测试替身，`failing` 为真时每次发送都返回错误
    #[derive(Default)]
    pub(crate) struct RecordingNotifier {
        pub failing: bool,
        sent: Mutex<Vec<SentNotification>>,
    }

    impl RecordingNotifier {
        pub fn failing() -> Self {
            Self {
                failing: true,
                ..Default::default()
            }
        }

        pub fn sent(&self) -> Vec<SentNotification> {
            self.sent.lock().unwrap().clone()
        }

        pub fn sent_with(&self, template: &str) -> Vec<SentNotification> {
            self.sent()
                .into_iter()
                .filter(|n| n.template == template)
                .collect()
        }
    }

    #[async_trait::async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, recipient: Recipient, template: &str, data: Value) -> Result<()> {
            self.sent.lock().unwrap().push(SentNotification {
                recipient,
                template: template.to_string(),
                data,
            });
            if self.failing {
                return Err(PeerReviewError::database_connection("mail relay unavailable"));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::recording::RecordingNotifier;
    use super::*;

    #[tokio::test]
    async fn test_failed_delivery_is_swallowed() {
        let notifier = RecordingNotifier::failing();
        notify_best_effort(
            &notifier,
            Recipient::User(7),
            TEMPLATE_REVIEW_RELEASED,
            serde_json::json!({ "review_id": 1 }),
        )
        .await;

        assert_eq!(notifier.sent().len(), 1);
    }

    #[test]
    fn test_recipient_display() {
        assert_eq!(Recipient::User(3).to_string(), "user:3");
        assert_eq!(
            Recipient::Email("a@b.example".to_string()).to_string(),
            "email:a@b.example"
        );
    }
}
