//! 归属校验
//!
//! 所有仅限教师的操作都经由这里判断调用者是否为所属课程的教师。
//! 管理员视为所有课程的拥有者；归属链断裂按无权限处理。

use std::fmt;

use crate::errors::{PeerReviewError, Result};
use crate::models::users::entities::{User, UserRole};
use crate::storage::Storage;

#[derive(Debug, Clone, Copy)]
pub enum OwnedResource {
    Review(i64),
    Assignment(i64),
    Submission(i64),
}

impl fmt::Display for OwnedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnedResource::Review(id) => write!(f, "peer review {id}"),
            OwnedResource::Assignment(id) => write!(f, "assignment {id}"),
            OwnedResource::Submission(id) => write!(f, "submission {id}"),
        }
    }
}

pub struct OwnershipResolver<'a> {
    storage: &'a dyn Storage,
}

impl<'a> OwnershipResolver<'a> {
    pub fn new(storage: &'a dyn Storage) -> Self {
        Self { storage }
    }

    pub async fn instructor_for(&self, resource: OwnedResource) -> Result<Option<i64>> {
        match resource {
            OwnedResource::Review(id) => self.storage.resolve_instructor_for_review(id).await,
            OwnedResource::Assignment(id) => {
                self.storage.resolve_instructor_for_assignment(id).await
            }
            OwnedResource::Submission(id) => {
                self.storage.resolve_instructor_for_submission(id).await
            }
        }
    }

    pub async fn is_owner(&self, caller: &User, resource: OwnedResource) -> Result<bool> {
        match caller.role {
            UserRole::Admin => Ok(true),
            UserRole::Student => Ok(false),
            UserRole::Instructor => Ok(self.instructor_for(resource).await? == Some(caller.id)),
        }
    }

    pub async fn ensure_owner(&self, caller: &User, resource: OwnedResource) -> Result<()> {
        if self.is_owner(caller, resource).await? {
            Ok(())
        } else {
            Err(PeerReviewError::forbidden(format!(
                "User {} is not the instructor of {resource}",
                caller.id
            )))
        }
    }
}
