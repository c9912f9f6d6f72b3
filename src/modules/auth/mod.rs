pub mod controller;
pub mod crud;
pub mod guard;
pub mod interface;
pub mod model;
pub mod routes;
pub mod schema;
pub mod service;
pub mod session;

pub use routes::{account_routes, admin_account_routes, admin_auth_routes, auth_routes};
