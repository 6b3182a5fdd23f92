pub mod auth;
pub mod client;
pub mod gateway;
mod models;
pub mod session;

pub use self::{auth::Auth, client::Backend, gateway::Gateway, session::Session};
