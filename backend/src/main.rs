#![deny(clippy::all)]
#![warn(clippy::nursery)]
#![warn(clippy::pedantic)]
#![warn(clippy::todo)]
// #![warn(clippy::cargo)]
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]

#[tokio::main]
async fn main() {
    app::run().await;
}


pub mod cfg {
    mod app_settings;
    mod database_settings;
    mod jwt_settings;
    mod mpesa_settings;
    mod server_settings;
    mod sms_settings;

    pub use app_settings::*;
    pub use database_settings::*;
    pub use jwt_settings::*;
    pub use mpesa_settings::*;
    pub use server_settings::*;
    pub use sms_settings::*;
}

pub mod core {
    mod context;
    mod dberror;

    pub use context::*;
    pub use dberror::*;
}

pub mod auth {
    mod jwt;
    mod password;

    pub use jwt::*;
    pub use password::*;
}

pub mod db {
    mod alerts;
    mod payments;
    mod sms_logs;
    mod templates;
    mod tenants;
    mod users;

    pub use alerts::*;
    pub use payments::*;
    pub use sms_logs::*;
    pub use templates::*;
    pub use tenants::*;
    pub use users::*;
}

/// Tenant matching and payment classification for incoming payments.
pub mod reconcile {
    mod phone;
    mod status;

    pub use phone::*;
    pub use status::*;
}

pub mod services {
    pub mod callback;
    pub mod dashboard;
    pub mod mpesa;
    pub mod notifications;
    pub mod sms;
}

pub mod routes {
    pub mod auth;
    pub mod dashboard;
    pub mod error;
    pub mod health;
    pub mod messaging;
    pub mod mpesa;
    pub mod payments;
    pub mod tenants;

    pub use error::{ApiError, ApiResult};
}

pub mod app {
    mod cli;
    mod migrations;
    mod router;
    mod seed;
    mod server;

    pub use cli::*;
    pub use migrations::*;
    pub use router::*;
    pub use seed::*;
    pub use server::*;
}
