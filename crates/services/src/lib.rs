#![forbid(unsafe_code)]

pub mod app_services;
pub mod engine;
pub mod error;
pub mod mirror;

pub use app_services::AppServices;
pub use engine::ProgressEngine;
pub use error::{AppServicesError, EngineError, MirrorError};
pub use mirror::{HttpMirror, MirrorConfig, MirrorFields, ProgressMirror};
