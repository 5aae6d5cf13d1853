use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{PeerReviewError, Result};

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{5,16}$").expect("Invalid username regex"));

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("Invalid email regex")
});

const COMMON_PASSWORDS: &[&str] = &[
    "password1",
    "qwerty123",
    "admin1234",
    "abcd1234",
    "welcome1",
    "letmein1",
];

/// 用户名：5 到 16 位字母、数字、下划线或连字符
pub fn validate_username(username: &str) -> Result<()> {
    if !USERNAME_RE.is_match(username) {
        return Err(PeerReviewError::validation(
            "Username must be 5-16 characters of letters, digits, '_' or '-'",
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<()> {
    if !EMAIL_RE.is_match(email) {
        return Err(PeerReviewError::validation("Email format is invalid"));
    }
    Ok(())
}

/// 密码策略：至少 8 位，包含大小写字母与数字，且不是常见弱密码
///
/// 所有不满足的规则合并在一条错误信息里返回。
pub fn validate_password(password: &str) -> Result<()> {
    let mut problems = Vec::new();

    if password.chars().count() < 8 {
        problems.push("at least 8 characters");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        problems.push("an uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        problems.push("a lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        problems.push("a digit");
    }

    if !problems.is_empty() {
        return Err(PeerReviewError::validation(format!(
            "Password must contain {}",
            problems.join(", ")
        )));
    }

    if COMMON_PASSWORDS
        .iter()
        .any(|weak| password.eq_ignore_ascii_case(weak))
    {
        return Err(PeerReviewError::validation(
            "Password is too common, please choose a stronger password",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_policy() {
        assert!(validate_username("alice_01").is_ok());
        assert!(validate_username("abc").is_err());
        assert!(validate_username("way_too_long_username").is_err());
        assert!(validate_username("bad name").is_err());
    }

    #[test]
    fn test_email_policy() {
        assert!(validate_email("alice@uni.example").is_ok());
        assert!(validate_email("alice@localhost").is_err());
        assert!(validate_email("no-at-sign.com").is_err());
    }

    #[test]
    fn test_valid_password() {
        assert!(validate_password("SecurePass123").is_ok());
        assert!(validate_password("MyP@ssw0rd").is_ok());
    }

    #[test]
    fn test_password_problems_are_combined() {
        let err = validate_password("abc").unwrap_err();
        assert_eq!(err.code(), "E005");
        assert!(err.message().contains("at least 8 characters"));
        assert!(err.message().contains("an uppercase letter"));
        assert!(err.message().contains("a digit"));
        assert!(!err.message().contains("a lowercase letter"));
    }

    #[test]
    fn test_common_password() {
        let err = validate_password("Password1").unwrap_err();
        assert!(err.message().contains("too common"));
    }
}
