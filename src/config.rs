use std::fs;
use std::path::{Path, PathBuf};

use chrono::Duration;
use rocket::{
    fairing::{Fairing, Info, Kind},
    serde::json::serde_json,
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::api::question::QuestionSpec;
use crate::store::{load_questions, MongoStore, Records};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    // secrets
    jwt_secret: String,
}

impl Config {
    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}

#[cfg(test)]
impl Config {
    pub fn new(jwt_secret: &str, auth_ttl: u32) -> Self {
        Self {
            auth_ttl,
            jwt_secret: jwt_secret.to_string(),
        }
    }
}

/// A fairing that loads the application config and puts it in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        Ok(rocket.manage(config))
    }
}

/// Configuration for the record store.
#[derive(Deserialize)]
struct StoreConfig {
    // secrets
    db_uri: Option<String>,
    // non-secrets
    #[serde(default = "default_db_name")]
    db_name: String,
    seed_path: Option<PathBuf>,
}

fn default_db_name() -> String {
    "polls".to_string()
}

/// A fairing that loads the store config, connects to MongoDB if a URI is
/// given (falling back to an in-memory store otherwise), seeds an empty
/// store from the configured fixture, and places the [`Records`] handle into
/// managed state.
pub struct StoreFairing;

#[rocket::async_trait]
impl Fairing for StoreFairing {
    fn info(&self) -> Info {
        Info {
            name: "Record store",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<StoreConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load store config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        let records = match config.db_uri {
            Some(ref db_uri) => {
                info!("Loaded database config, connecting...");
                match MongoStore::connect(db_uri, &config.db_name).await {
                    Ok(store) => {
                        info!("...database connection online!");
                        Records::new(store)
                    }
                    Err(e) => {
                        error!("Failed to connect to database: {e}");
                        return Err(rocket);
                    }
                }
            }
            None => {
                warn!("No `db_uri` configured; records will not outlive this process");
                Records::memory()
            }
        };

        if let Some(ref path) = config.seed_path {
            if let Err(e) = seed(&records, path).await {
                error!("Failed to seed questions from {}: {e}", path.display());
                return Err(rocket);
            }
        }

        Ok(rocket.manage(records))
    }
}

/// Load the fixture at `path` into the store, unless it already has questions.
async fn seed(records: &Records, path: &Path) -> Result<(), String> {
    let existing = records.question_count().await.map_err(|e| e.to_string())?;
    if existing > 0 {
        info!("Store already has {existing} questions, skipping seed");
        return Ok(());
    }

    let raw = fs::read_to_string(path).map_err(|e| e.to_string())?;
    let specs: Vec<QuestionSpec> = serde_json::from_str(&raw).map_err(|e| e.to_string())?;
    let count = load_questions(&**records, specs)
        .await
        .map_err(|e| e.to_string())?;
    info!("Seeded {count} questions from {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use rocket::figment::Figment;

    fn fixture_path() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/polls.json")
    }

    #[test]
    fn store_config_defaults() {
        let config: StoreConfig = Figment::new().extract().unwrap();
        assert!(config.db_uri.is_none());
        assert_eq!(config.db_name, "polls");
        assert!(config.seed_path.is_none());
    }

    #[test]
    fn auth_ttl_is_in_seconds() {
        assert_eq!(Config::new("secret", 90).auth_ttl(), Duration::seconds(90));
    }

    #[rocket::async_test]
    async fn seeds_only_an_empty_store() {
        let records = Records::memory();
        seed(&records, &fixture_path()).await.unwrap();
        let seeded = records.question_count().await.unwrap();
        assert!(seeded > 0);

        seed(&records, &fixture_path()).await.unwrap();
        assert_eq!(records.question_count().await.unwrap(), seeded);
    }

    #[rocket::async_test]
    async fn missing_fixture_is_an_error() {
        let records = Records::memory();
        let result = seed(&records, Path::new("does/not/exist.json")).await;
        assert!(result.is_err());
    }
}
