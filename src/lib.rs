pub mod config;
pub mod domain;
pub mod messaging;
pub mod metrics;
pub mod notifiers;
pub mod repository;
pub mod service;
pub mod utils;
