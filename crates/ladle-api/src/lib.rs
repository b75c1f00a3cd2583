pub mod auth;
pub mod error;
pub mod generate;
pub mod middleware;
pub mod recipes;
pub mod router;
