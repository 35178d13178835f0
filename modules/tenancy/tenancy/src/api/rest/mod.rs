pub mod dto;
pub mod error;
pub mod handlers;
pub mod problem;
pub mod routes;
pub mod tenant_context;
