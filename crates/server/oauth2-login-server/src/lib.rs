//! Login server: landing page, `/login` redirect and the OAuth2 callback.

pub mod config;
pub mod routes;
pub mod telemetry;
