pub mod app;
pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod freshness;
pub mod fs_util;
pub mod output;
pub mod planner;
pub mod summary;
pub mod tools;
