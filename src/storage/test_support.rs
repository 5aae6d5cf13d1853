//! 测试用的内存 SQLite 存储与数据构造

use std::sync::Arc;

use sea_orm::{ConnectOptions, Database};

use super::Storage;
use super::sea_orm_storage::SeaOrmStorage;
use crate::models::{
    courses::{
        entities::{Assignment, Course, Submission},
        requests::{CreateAssignmentRequest, CreateCourseRequest},
    },
    rubrics::{
        entities::Rubric,
        requests::{CreateCriterionRequest, CreatePerformanceLevelRequest, CreateRubricRequest},
    },
    users::{entities::User, entities::UserRole, requests::CreateUserRequest},
};

/// 单连接内存数据库，事务内外看到同一份数据
pub(crate) async fn memory_storage_impl() -> SeaOrmStorage {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(opt).await.unwrap();
    SeaOrmStorage::from_connection(db).await.unwrap()
}

pub(crate) async fn memory_storage() -> Arc<dyn Storage> {
    Arc::new(memory_storage_impl().await)
}

pub(crate) async fn create_user(storage: &Arc<dyn Storage>, username: &str, role: UserRole) -> User {
    storage
        .create_user(CreateUserRequest {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: "not-a-real-hash".to_string(),
            role,
            display_name: Some(format!("{username} display")),
        })
        .await
        .unwrap()
}

pub(crate) async fn create_course(
    storage: &Arc<dyn Storage>,
    instructor_id: i64,
    requires_approval: bool,
) -> Course {
    storage
        .create_course(
            instructor_id,
            CreateCourseRequest {
                name: "Distributed Systems".to_string(),
                description: None,
                requires_approval,
                instructor_id: None,
            },
        )
        .await
        .unwrap()
}

/// 两个维度：Argument（权重 2，满分 10）与 Style（权重 1，满分 5）
pub(crate) async fn create_rubric(storage: &Arc<dyn Storage>, created_by: i64) -> Rubric {
    storage
        .create_rubric(
            created_by,
            CreateRubricRequest {
                title: "Essay rubric".to_string(),
                criteria: vec![
                    CreateCriterionRequest {
                        name: "Argument".to_string(),
                        description: None,
                        weight: 2.0,
                        max_points: 10.0,
                        levels: vec![
                            CreatePerformanceLevelRequest {
                                points: 0.0,
                                description: "Missing".to_string(),
                            },
                            CreatePerformanceLevelRequest {
                                points: 10.0,
                                description: "Convincing".to_string(),
                            },
                        ],
                    },
                    CreateCriterionRequest {
                        name: "Style".to_string(),
                        description: Some("Clarity of prose".to_string()),
                        weight: 1.0,
                        max_points: 5.0,
                        levels: vec![],
                    },
                ],
            },
        )
        .await
        .unwrap()
}

pub(crate) async fn create_assignment(
    storage: &Arc<dyn Storage>,
    course_id: i64,
    rubric_id: Option<i64>,
) -> Assignment {
    storage
        .create_assignment(
            course_id,
            CreateAssignmentRequest {
                title: "Essay 1".to_string(),
                description: None,
                due_date: None,
                rubric_id,
            },
        )
        .await
        .unwrap()
}

pub(crate) async fn create_submission(
    storage: &Arc<dyn Storage>,
    assignment_id: i64,
    author_id: i64,
) -> Submission {
    storage
        .create_submission(assignment_id, author_id, "My essay".to_string())
        .await
        .unwrap()
}

/// 一套完整的互评场景数据
pub(crate) struct Fixture {
    pub storage: Arc<dyn Storage>,
    pub admin: User,
    pub instructor: User,
    pub other_instructor: User,
    pub author: User,
    pub reviewer: User,
    pub other_student: User,
    pub course: Course,
    pub rubric: Rubric,
    pub assignment: Assignment,
    pub submission: Submission,
}

impl Fixture {
    pub async fn new() -> Self {
        let storage = memory_storage().await;
        let admin = create_user(&storage, "admin", UserRole::Admin).await;
        let instructor = create_user(&storage, "prof", UserRole::Instructor).await;
        let other_instructor = create_user(&storage, "other_prof", UserRole::Instructor).await;
        let author = create_user(&storage, "alice", UserRole::Student).await;
        let reviewer = create_user(&storage, "bob", UserRole::Student).await;
        let other_student = create_user(&storage, "carol", UserRole::Student).await;

        let course = create_course(&storage, instructor.id, false).await;
        let rubric = create_rubric(&storage, instructor.id).await;
        let assignment = create_assignment(&storage, course.id, Some(rubric.id)).await;
        let submission = create_submission(&storage, assignment.id, author.id).await;

        Self {
            storage,
            admin,
            instructor,
            other_instructor,
            author,
            reviewer,
            other_student,
            course,
            rubric,
            assignment,
            submission,
        }
    }

    pub fn criterion_id(&self, name: &str) -> i64 {
        self.rubric
            .criteria
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.id)
            .unwrap()
    }
}
