pub mod auth;
pub mod configuration;
pub mod error;
pub mod handlers;
pub mod models;
pub mod permissions;
pub mod repository;
pub mod seeder;
pub mod slug;
pub mod startup;
pub mod telemetry;
