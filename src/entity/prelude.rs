//! 预导入模块，方便使用

pub use super::assignments::{
    ActiveModel as AssignmentActiveModel, Entity as Assignments, Model as AssignmentModel,
};
pub use super::courses::{ActiveModel as CourseActiveModel, Entity as Courses, Model as CourseModel};
pub use super::enrollment_requests::{
    ActiveModel as EnrollmentRequestActiveModel, Entity as EnrollmentRequests,
    Model as EnrollmentRequestModel,
};
pub use super::enrollments::{
    ActiveModel as EnrollmentActiveModel, Entity as Enrollments, Model as EnrollmentModel,
};
pub use super::peer_reviews::{
    ActiveModel as PeerReviewActiveModel, Entity as PeerReviews, Model as PeerReviewModel,
};
pub use super::performance_levels::{
    ActiveModel as PerformanceLevelActiveModel, Entity as PerformanceLevels,
    Model as PerformanceLevelModel,
};
pub use super::review_scores::{
    ActiveModel as ReviewScoreActiveModel, Entity as ReviewScores, Model as ReviewScoreModel,
};
pub use super::rubric_criteria::{
    ActiveModel as RubricCriterionActiveModel, Entity as RubricCriteria,
    Model as RubricCriterionModel,
};
pub use super::rubrics::{ActiveModel as RubricActiveModel, Entity as Rubrics, Model as RubricModel};
pub use super::submissions::{
    ActiveModel as SubmissionActiveModel, Entity as Submissions, Model as SubmissionModel,
};
pub use super::users::{ActiveModel as UserActiveModel, Entity as Users, Model as UserModel};
pub use super::verification_tokens::{
    ActiveModel as VerificationTokenActiveModel, Entity as VerificationTokens,
    Model as VerificationTokenModel,
};
