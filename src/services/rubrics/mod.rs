use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use tracing::info;

use crate::errors::{PeerReviewError, Result};
use crate::models::ApiResponse;
use crate::models::rubrics::{entities::Rubric, requests::CreateRubricRequest};
use crate::models::users::entities::User;
use crate::services::current_user;
use crate::storage::Storage;

pub struct RubricService {
    storage: Option<Arc<dyn Storage>>,
}

impl RubricService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> Arc<dyn Storage> {
        match &self.storage {
            Some(storage) => storage.clone(),
            None => super::shared::<dyn Storage>(request),
        }
    }

    pub async fn create_rubric(
        &self,
        request: &HttpRequest,
        body: CreateRubricRequest,
    ) -> ActixResult<HttpResponse> {
        let storage = self.get_storage(request);
        let result = async {
            let caller = current_user(request)?;
            create_rubric(&storage, &caller, body).await
        }
        .await;

        Ok(ApiResponse::respond_created(result, "Rubric created"))
    }

    pub async fn get_rubric(&self, request: &HttpRequest, rubric_id: i64) -> ActixResult<HttpResponse> {
        let storage = self.get_storage(request);
        let result = get_rubric(&storage, rubric_id).await;
        Ok(ApiResponse::respond(result, "Rubric retrieved"))
    }
}

/// 创建评分量规，结构不合法时不写入任何数据
pub async fn create_rubric(
    storage: &Arc<dyn Storage>,
    caller: &User,
    req: CreateRubricRequest,
) -> Result<Rubric> {
    req.validate()?;
    let rubric = storage.create_rubric(caller.id, req).await?;
    info!(
        "Rubric {} with {} criteria created by user {}",
        rubric.id,
        rubric.criteria.len(),
        caller.id
    );
    Ok(rubric)
}

pub async fn get_rubric(storage: &Arc<dyn Storage>, rubric_id: i64) -> Result<Rubric> {
    storage
        .get_rubric_by_id(rubric_id)
        .await?
        .ok_or_else(|| PeerReviewError::not_found(format!("Rubric {rubric_id} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::rubrics::requests::{CreateCriterionRequest, CreatePerformanceLevelRequest};
    use crate::models::users::entities::UserRole;
    use crate::storage::test_support::{create_user, memory_storage};

    #[tokio::test]
    async fn test_invalid_rubric_is_not_stored() {
        let storage = memory_storage().await;
        let prof = create_user(&storage, "prof", UserRole::Instructor).await;

        let err = create_rubric(
            &storage,
            &prof,
            CreateRubricRequest {
                title: "Lab".to_string(),
                criteria: vec![CreateCriterionRequest {
                    name: "Method".to_string(),
                    description: None,
                    weight: 1.0,
                    max_points: 4.0,
                    levels: vec![CreatePerformanceLevelRequest {
                        points: 5.0,
                        description: "Beyond max".to_string(),
                    }],
                }],
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.code(), "E005");
        assert_eq!(get_rubric(&storage, 1).await.unwrap_err().code(), "E006");
    }
}
