use super::{SeaOrmStorage, db_err};
use crate::entity::assignments::{
    ActiveModel as AssignmentActiveModel, Column as AssignmentColumn, Entity as Assignments,
};
use crate::entity::courses::{ActiveModel as CourseActiveModel, Entity as Courses};
use crate::entity::peer_reviews::{Column as PeerReviewColumn, Entity as PeerReviews};
use crate::entity::review_scores::{Column as ReviewScoreColumn, Entity as ReviewScores};
use crate::entity::rubrics::Entity as Rubrics;
use crate::entity::submissions::{
    ActiveModel as SubmissionActiveModel, Column as SubmissionColumn, Entity as Submissions,
};
use crate::errors::{PeerReviewError, Result};
use crate::models::courses::{
    entities::{Assignment, Course, Submission},
    requests::{CreateAssignmentRequest, CreateCourseRequest},
};
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
    TransactionTrait,
};

impl SeaOrmStorage {
    /// 创建课程
    pub async fn create_course_impl(
        &self,
        instructor_id: i64,
        req: CreateCourseRequest,
    ) -> Result<Course> {
        let now = chrono::Utc::now().timestamp();

        let model = CourseActiveModel {
            instructor_id: Set(instructor_id),
            name: Set(req.name),
            description: Set(req.description),
            requires_approval: Set(req.requires_approval),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(db_err("创建课程失败"))?;

        Ok(result.into_course())
    }

    /// 通过 ID 获取课程
    pub async fn get_course_by_id_impl(&self, course_id: i64) -> Result<Option<Course>> {
        let result = Courses::find_by_id(course_id)
            .one(&self.db)
            .await
            .map_err(db_err("查询课程失败"))?;

        Ok(result.map(|m| m.into_course()))
    }

    /// 创建作业
    pub async fn create_assignment_impl(
        &self,
        course_id: i64,
        req: CreateAssignmentRequest,
    ) -> Result<Assignment> {
        let now = chrono::Utc::now().timestamp();

        let model = AssignmentActiveModel {
            course_id: Set(course_id),
            title: Set(req.title),
            description: Set(req.description),
            due_date: Set(req.due_date.map(|d| d.timestamp())),
            rubric_id: Set(req.rubric_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(db_err("创建作业失败"))?;

        Ok(result.into_assignment())
    }

    /// 通过 ID 获取作业
    pub async fn get_assignment_by_id_impl(&self, assignment_id: i64) -> Result<Option<Assignment>> {
        let result = Assignments::find_by_id(assignment_id)
            .one(&self.db)
            .await
            .map_err(db_err("查询作业失败"))?;

        Ok(result.map(|m| m.into_assignment()))
    }

    /// 绑定或解绑评分量规
    ///
    /// 已存储的评分依赖于当前量规的维度，存在评分时拒绝修改绑定。
    pub async fn bind_assignment_rubric_impl(
        &self,
        assignment_id: i64,
        rubric_id: Option<i64>,
    ) -> Result<Assignment> {
        let txn = self.db.begin().await.map_err(db_err("开启事务失败"))?;

        let assignment = Assignments::find_by_id(assignment_id)
            .one(&txn)
            .await
            .map_err(db_err("查询作业失败"))?
            .ok_or_else(|| {
                PeerReviewError::not_found(format!("Assignment {assignment_id} not found"))
            })?;

        if let Some(rubric_id) = rubric_id {
            let exists = Rubrics::find_by_id(rubric_id)
                .one(&txn)
                .await
                .map_err(db_err("查询评分量规失败"))?
                .is_some();
            if !exists {
                return Err(PeerReviewError::not_found(format!(
                    "Rubric {rubric_id} not found"
                )));
            }
        }

        if assignment.rubric_id == rubric_id {
            txn.commit().await.map_err(db_err("提交事务失败"))?;
            return Ok(assignment.into_assignment());
        }

        let scored = ReviewScores::find()
            .filter(
                ReviewScoreColumn::PeerReviewId.in_subquery(
                    Query::select()
                        .column(PeerReviewColumn::Id)
                        .from(PeerReviews)
                        .and_where(
                            PeerReviewColumn::SubmissionId.in_subquery(
                                Query::select()
                                    .column(SubmissionColumn::Id)
                                    .from(Submissions)
                                    .and_where(SubmissionColumn::AssignmentId.eq(assignment_id))
                                    .to_owned(),
                            ),
                        )
                        .to_owned(),
                ),
            )
            .count(&txn)
            .await
            .map_err(db_err("统计评分失败"))?;

        if scored > 0 {
            return Err(PeerReviewError::invalid_state(format!(
                "Assignment {assignment_id} already has {scored} stored review scores, rubric binding cannot change"
            )));
        }

        Assignments::update_many()
            .col_expr(AssignmentColumn::RubricId, Expr::value(rubric_id))
            .col_expr(
                AssignmentColumn::UpdatedAt,
                Expr::value(chrono::Utc::now().timestamp()),
            )
            .filter(AssignmentColumn::Id.eq(assignment_id))
            .exec(&txn)
            .await
            .map_err(db_err("更新作业量规失败"))?;

        let updated = Assignments::find_by_id(assignment_id)
            .one(&txn)
            .await
            .map_err(db_err("查询作业失败"))?
            .ok_or_else(|| {
                PeerReviewError::not_found(format!("Assignment {assignment_id} not found"))
            })?;

        txn.commit().await.map_err(db_err("提交事务失败"))?;

        Ok(updated.into_assignment())
    }

    /// 创建提交
    pub async fn create_submission_impl(
        &self,
        assignment_id: i64,
        author_id: i64,
        content: String,
    ) -> Result<Submission> {
        let model = SubmissionActiveModel {
            assignment_id: Set(assignment_id),
            author_id: Set(author_id),
            content: Set(content),
            submitted_at: Set(chrono::Utc::now().timestamp()),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(db_err("创建提交失败"))?;

        Ok(result.into_submission())
    }

    /// 通过 ID 获取提交
    pub async fn get_submission_by_id_impl(&self, submission_id: i64) -> Result<Option<Submission>> {
        let result = Submissions::find_by_id(submission_id)
            .one(&self.db)
            .await
            .map_err(db_err("查询提交失败"))?;

        Ok(result.map(|m| m.into_submission()))
    }
}
