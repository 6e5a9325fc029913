//! infra-helper: a small AWS control plane for S3 buckets and EC2 instances.
//!
//! The library exposes the bucket lifecycle manager, the EC2 provisioning
//! workflow and the thin JSON API that fronts them. Every remote call goes
//! through explicitly constructed service clients so orchestration logic can
//! be tested against doubles.

pub mod api;
pub mod aws;
pub mod config;
pub mod provision;
pub mod user_data;
