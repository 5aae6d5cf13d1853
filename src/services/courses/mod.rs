pub mod assignments;
pub mod create;
pub mod submissions;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::courses::requests::{
    BindRubricRequest, CreateAssignmentRequest, CreateCourseRequest, CreateSubmissionRequest,
};
use crate::storage::Storage;

pub struct CourseService {
    storage: Option<Arc<dyn Storage>>,
}

impl CourseService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> Arc<dyn Storage> {
        match &self.storage {
            Some(storage) => storage.clone(),
            None => super::shared::<dyn Storage>(request),
        }
    }

    pub async fn create_course(
        &self,
        request: &HttpRequest,
        body: CreateCourseRequest,
    ) -> ActixResult<HttpResponse> {
        create::handle_create_course(self, request, body).await
    }

    pub async fn create_assignment(
        &self,
        request: &HttpRequest,
        course_id: i64,
        body: CreateAssignmentRequest,
    ) -> ActixResult<HttpResponse> {
        assignments::handle_create_assignment(self, request, course_id, body).await
    }

    // 绑定/解绑评分量规
    pub async fn bind_rubric(
        &self,
        request: &HttpRequest,
        assignment_id: i64,
        body: BindRubricRequest,
    ) -> ActixResult<HttpResponse> {
        assignments::handle_bind_rubric(self, request, assignment_id, body).await
    }

    pub async fn create_submission(
        &self,
        request: &HttpRequest,
        assignment_id: i64,
        body: CreateSubmissionRequest,
    ) -> ActixResult<HttpResponse> {
        submissions::handle_create_submission(self, request, assignment_id, body).await
    }
}
