pub mod article;
pub mod liveness;
pub mod readiness;
