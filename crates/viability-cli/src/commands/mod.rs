pub mod analysis;
pub mod flows;
pub mod grading;
