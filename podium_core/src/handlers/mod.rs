pub mod files;
pub mod health;
pub mod routes;
pub mod session;
pub mod upload;
