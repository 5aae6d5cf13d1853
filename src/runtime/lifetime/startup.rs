use crate::errors::Result;
use crate::models::users::entities::UserRole;
use crate::models::users::requests::CreateUserRequest;
use crate::services::{LogNotifier, Notifier};
use crate::storage::Storage;
use crate::utils::password::hash_password;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const SEED_ADMIN_USERNAME: &str = "admin";
const GENERATED_PASSWORD_LEN: usize = 16;

pub struct StartupContext {
    pub storage: Arc<dyn Storage>,
    pub notifier: Arc<dyn Notifier>,
}

fn generate_password(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789!@#$%";
    let mut rng = rand::rng();
    (0..length)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}

/// 空库时创建管理员，返回是否新建
///
/// 密码取 `ADMIN_PASSWORD`，未设置时随机生成并只在日志中出现一次。
async fn seed_admin(storage: &Arc<dyn Storage>) -> Result<bool> {
    let existing = storage.count_users().await?;
    if existing > 0 {
        debug!("{} user(s) present, admin seed skipped", existing);
        return Ok(false);
    }

    let password = match std::env::var("ADMIN_PASSWORD") {
        Ok(password) if !password.is_empty() => password,
        _ => {
            let generated = generate_password(GENERATED_PASSWORD_LEN);
            warn!(
                "ADMIN_PASSWORD not set, generated password for '{}': {}",
                SEED_ADMIN_USERNAME, generated
            );
            generated
        }
    };

    let admin = storage
        .create_user(CreateUserRequest {
            username: SEED_ADMIN_USERNAME.to_string(),
            email: "admin@localhost".to_string(),
            password: hash_password(&password)?,
            role: UserRole::Admin,
            display_name: Some("Administrator".to_string()),
        })
        .await?;

    info!("Seeded admin account (ID: {})", admin.id);
    Ok(true)
}

/// 准备服务器启动的上下文：存储与迁移、默认管理员、通知器
pub async fn prepare_server_startup() -> StartupContext {
    let storage = crate::storage::create_storage()
        .await
        .expect("Failed to create storage backend");
    warn!("Storage backend initialized and migrations completed");

    // 种子失败不阻止启动，管理员可稍后手动创建
    if let Err(e) = seed_admin(&storage).await {
        error!("Admin seed failed: {}", e.format_simple());
    }

    // 投递由外部系统负责，这里只落日志
    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);

    StartupContext { storage, notifier }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::{create_user, memory_storage};

    #[test]
    fn test_generated_password_shape() {
        let password = generate_password(GENERATED_PASSWORD_LEN);
        assert_eq!(password.chars().count(), GENERATED_PASSWORD_LEN);
        assert!(!password.contains('0') && !password.contains('O'));
    }

    #[tokio::test]
    async fn test_seed_is_skipped_when_users_exist() {
        let storage = memory_storage().await;
        create_user(&storage, "someone", UserRole::Student).await;

        assert!(!seed_admin(&storage).await.unwrap());
        assert_eq!(storage.count_users().await.unwrap(), 1);
    }
}
