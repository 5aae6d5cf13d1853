//! 互评生命周期与发布闸门
//!
//! 每个操作拆成两层：接收显式调用者的核心函数（可直接测试），
//! 以及从请求中取出依赖与当前用户的 `handle_*` 处理函数。

pub mod assign;
pub mod delete;
pub mod deposit;
pub mod list;
pub mod release;
pub mod scores;
pub mod status;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::peer_reviews::requests::{
    AssignReviewRequest, DepositAiReviewRequest, RecordScoresRequest, SetReviewStatusRequest,
};
use crate::services::notifier::Notifier;
use crate::storage::Storage;

pub struct PeerReviewService {
    storage: Option<Arc<dyn Storage>>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl PeerReviewService {
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

    // 分配评审人
    pub async fn assign(
        &self,
        request: &HttpRequest,
        body: AssignReviewRequest,
    ) -> ActixResult<HttpResponse> {
        assign::handle_assign(self, request, body).await
    }

    // 作业下的互评列表
    pub async fn list_for_assignment(
        &self,
        request: &HttpRequest,
        assignment_id: i64,
    ) -> ActixResult<HttpResponse> {
        list::handle_list(self, request, assignment_id).await
    }

    pub async fn get(&self, request: &HttpRequest, review_id: i64) -> ActixResult<HttpResponse> {
        list::handle_get(self, request, review_id).await
    }

    pub async fn delete(&self, request: &HttpRequest, review_id: i64) -> ActixResult<HttpResponse> {
        delete::handle_delete(self, request, review_id).await
    }

    pub async fn set_status(
        &self,
        request: &HttpRequest,
        review_id: i64,
        body: SetReviewStatusRequest,
    ) -> ActixResult<HttpResponse> {
        status::handle_set_status(self, request, review_id, body).await
    }

    pub async fn record_scores(
        &self,
        request: &HttpRequest,
        review_id: i64,
        body: RecordScoresRequest,
    ) -> ActixResult<HttpResponse> {
        scores::handle_record_scores(self, request, review_id, body).await
    }

    // 发布单条 AI 互评
    pub async fn release(&self, request: &HttpRequest, review_id: i64) -> ActixResult<HttpResponse> {
        release::handle_release_one(self, request, review_id).await
    }

    // 发布作业下全部 AI 互评
    pub async fn release_assignment(
        &self,
        request: &HttpRequest,
        assignment_id: i64,
    ) -> ActixResult<HttpResponse> {
        release::handle_release_all(self, request, assignment_id).await
    }

    pub async fn count_unreleased(
        &self,
        request: &HttpRequest,
        assignment_id: i64,
    ) -> ActixResult<HttpResponse> {
        release::handle_count_unreleased(self, request, assignment_id).await
    }

    // AI 评审写入
    pub async fn deposit_ai_review(
        &self,
        request: &HttpRequest,
        submission_id: i64,
        body: DepositAiReviewRequest,
    ) -> ActixResult<HttpResponse> {
        deposit::handle_deposit(self, request, submission_id, body).await
    }
}
