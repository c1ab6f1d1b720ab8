// Middleware modules for the scholarship portal

pub mod cors;

pub use cors::dynamic_cors_middleware;
