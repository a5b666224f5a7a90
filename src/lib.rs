pub mod calendar;
pub mod config;
pub mod model;
pub mod report;
pub mod storage;
