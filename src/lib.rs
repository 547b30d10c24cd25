#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod store;
pub mod voting;

use config::{ConfigFairing, StoreFairing};
use logging::LoggerFairing;

/// Build the server: configuration, record store, request logging and routes.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .attach(ConfigFairing)
        .attach(StoreFairing)
        .attach(LoggerFairing)
        .mount("/", api::routes())
}

/// Build a server over the given records, with a fixed test configuration.
#[cfg(test)]
pub(crate) fn rocket_for_store(records: store::Records) -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("jwt_secret", "polls test secret"))
        .merge(("auth_ttl", 3600))
        .merge(("log_level", rocket::config::LogLevel::Off));
    rocket::custom(figment)
        .attach(ConfigFairing)
        .attach(LoggerFairing)
        .manage(records)
        .mount("/", api::routes())
}
