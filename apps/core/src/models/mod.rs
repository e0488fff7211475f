pub mod resume;
pub mod tailoring;
pub mod upload;
