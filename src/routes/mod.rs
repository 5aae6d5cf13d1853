pub mod assignments;

pub mod auth;

pub mod courses;

pub mod peer_reviews;

pub mod rubrics;

pub use assignments::configure_assignment_routes;
pub use auth::configure_auth_routes;
pub use courses::configure_course_routes;
pub use peer_reviews::configure_peer_review_routes;
pub use rubrics::configure_rubric_routes;
