// Library exports for Rendezveux
// This allows integration tests and the binary to share modules

pub mod accounts;
pub mod config;
pub mod db;
pub mod error;
pub mod graphql;
pub mod posts;
pub mod revalidate;
pub mod routes;
pub mod state;
