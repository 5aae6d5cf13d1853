use std::sync::Arc;

use crate::models::{
    auth::entities::PendingRegistration,
    courses::{
        entities::{Assignment, Course, EnrollmentOutcome, Submission},
        requests::{CreateAssignmentRequest, CreateCourseRequest},
    },
    peer_reviews::entities::{
        NewPeerReview, PeerReview, PeerReviewDetail, ReviewStatus, ValidatedScore,
    },
    rubrics::{entities::Rubric, requests::CreateRubricRequest},
    users::{entities::User, requests::CreateUserRequest},
};

use crate::errors::Result;

pub mod sea_orm_storage;

#[cfg(test)]
pub(crate) mod test_support;

#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// 用户管理方法
    // 创建用户，用户名或邮箱重复返回 Conflict
    async fn create_user(&self, user: CreateUserRequest) -> Result<User>;
    // 通过ID获取用户信息
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>>;
    // 通过用户名获取用户信息
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    // 通过邮箱获取用户信息
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    // 通过用户名或邮箱获取用户信息
    async fn get_user_by_username_or_email(&self, identifier: &str) -> Result<Option<User>>;
    // 更新用户最后登录时间
    async fn update_last_login(&self, id: i64) -> Result<bool>;
    // 用户总数
    async fn count_users(&self) -> Result<u64>;

    /// 注册与邮箱验证
    // 保存待验证的注册信息
    async fn create_verification_token(&self, pending: PendingRegistration) -> Result<()>;
    // 单事务完成注册：创建用户、加入课程或提交申请、作废令牌
    async fn complete_registration(&self, token: &str) -> Result<(User, EnrollmentOutcome)>;

    /// 课程、作业与提交
    async fn create_course(&self, instructor_id: i64, req: CreateCourseRequest) -> Result<Course>;
    async fn get_course_by_id(&self, course_id: i64) -> Result<Option<Course>>;
    async fn create_assignment(
        &self,
        course_id: i64,
        req: CreateAssignmentRequest,
    ) -> Result<Assignment>;
    async fn get_assignment_by_id(&self, assignment_id: i64) -> Result<Option<Assignment>>;
    // 绑定或解绑评分量规，已有评分时返回 InvalidState
    async fn bind_assignment_rubric(
        &self,
        assignment_id: i64,
        rubric_id: Option<i64>,
    ) -> Result<Assignment>;
    async fn create_submission(
        &self,
        assignment_id: i64,
        author_id: i64,
        content: String,
    ) -> Result<Submission>;
    async fn get_submission_by_id(&self, submission_id: i64) -> Result<Option<Submission>>;

    /// 评分量规
    async fn create_rubric(&self, created_by: i64, req: CreateRubricRequest) -> Result<Rubric>;
    async fn get_rubric_by_id(&self, rubric_id: i64) -> Result<Option<Rubric>>;

    /// 归属链：提交 → 作业 → 课程 → 教师，任何一环缺失返回 None
    async fn resolve_instructor_for_review(&self, review_id: i64) -> Result<Option<i64>>;
    async fn resolve_instructor_for_assignment(&self, assignment_id: i64) -> Result<Option<i64>>;
    async fn resolve_instructor_for_submission(&self, submission_id: i64) -> Result<Option<i64>>;

    /// 互评管理方法
    // 新建互评，(submission, reviewer) 重复返回 DuplicateAssignment
    async fn create_peer_review(&self, review: NewPeerReview) -> Result<PeerReview>;
    async fn get_peer_review(&self, review_id: i64) -> Result<Option<PeerReviewDetail>>;
    async fn list_peer_reviews_for_assignment(
        &self,
        assignment_id: i64,
    ) -> Result<Vec<PeerReviewDetail>>;
    // 仅删除未完成的互评，返回是否删除
    async fn delete_unfinished_peer_review(&self, review_id: i64) -> Result<bool>;
    // 更新状态并推导完成时间，互评不存在返回 None
    async fn update_peer_review_status(
        &self,
        review_id: i64,
        status: ReviewStatus,
    ) -> Result<Option<PeerReview>>;
    // 单事务写入评分并重算总分，互评已完成返回 InvalidState
    async fn save_review_scores(
        &self,
        review_id: i64,
        rubric: &Rubric,
        scores: Vec<ValidatedScore>,
        overall_feedback: Option<String>,
    ) -> Result<PeerReviewDetail>;
    // 单事务写入 AI 互评及其评分
    async fn deposit_ai_review(
        &self,
        review: NewPeerReview,
        rubric: Option<&Rubric>,
        scores: Vec<ValidatedScore>,
    ) -> Result<PeerReviewDetail>;

    /// 发布闸门
    // 条件更新单条 AI 互评，返回受影响行数
    async fn release_peer_review(&self, review_id: i64) -> Result<u64>;
    // 条件批量更新作业下所有未发布的 AI 互评
    async fn release_assignment_reviews(&self, assignment_id: i64) -> Result<u64>;
    async fn count_unreleased_reviews(&self, assignment_id: i64) -> Result<u64>;
}

pub async fn create_storage() -> Result<Arc<dyn Storage>> {
    let storage = sea_orm_storage::SeaOrmStorage::new_async().await?;
    Ok(Arc::new(storage))
}
