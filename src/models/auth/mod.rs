pub mod entities;
pub mod requests;
pub mod responses;

pub use requests::{LoginRequest, RegisterRequest, VerifyEmailRequest};
