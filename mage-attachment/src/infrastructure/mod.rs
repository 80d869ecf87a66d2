pub mod auth;
pub mod cache;
pub mod local;
pub mod media_processor;
pub mod persistence;
pub mod remote;
