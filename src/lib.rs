pub mod engine;
pub mod gateway;
pub mod models;
pub mod relations;
pub mod storage;
pub mod types;
