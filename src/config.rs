// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::{
    db::{Collection, DocumentStore, MemoryDocumentStore, PgDocumentStore, Repository, UserDirectory},
    services::{
        auth::AuthService, candidate_service::CandidateService, event_service::EventService,
        lodge_service::LodgeService, member_service::MemberService, message_service::MessageService,
        role_transfer::RoleTransferService,
    },
};

pub const DEFAULT_DISTRICT_LODGE_NAME: &str = "District Grand Lodge of Syria-Lebanon";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub bind_addr: String,
    pub district_lodge_name: String,
    pub seed_admin: Option<(String, String)>,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let store_backend = match env::var("STORE_BACKEND").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            Ok("postgres") | Err(_) => StoreBackend::Postgres,
            Ok(other) => anyhow::bail!("Unknown STORE_BACKEND '{}'", other),
        };

        let database_url = env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL must be set when STORE_BACKEND=postgres");
        }

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;

        let seed_admin = match (env::var("SEED_ADMIN_EMAIL"), env::var("SEED_ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) => Some((email, password)),
            _ => None,
        };

        Ok(Self {
            store_backend,
            database_url,
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 5)?,
            jwt_secret,
            jwt_ttl_hours: parse_or("JWT_TTL_HOURS", 24 * 7)?,
            bcrypt_cost: parse_or("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            district_lodge_name: env::var("DISTRICT_LODGE_NAME")
                .unwrap_or_else(|_| DEFAULT_DISTRICT_LODGE_NAME.to_string()),
            seed_admin,
        })
    }

    /// Memory-backed settings with the cheapest bcrypt cost.
    pub fn in_memory(jwt_secret: &str) -> Self {
        Self {
            store_backend: StoreBackend::Memory,
            database_url: None,
            database_max_connections: 1,
            jwt_secret: jwt_secret.to_string(),
            jwt_ttl_hours: 1,
            bcrypt_cost: 4,
            bind_addr: "127.0.0.1:0".to_string(),
            district_lodge_name: DEFAULT_DISTRICT_LODGE_NAME.to_string(),
            seed_admin: None,
        }
    }
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{} has an invalid value '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: Arc<dyn DocumentStore>,
    pub auth_service: AuthService,
    pub member_service: MemberService,
    pub role_service: RoleTransferService,
    pub lodge_service: LodgeService,
    pub candidate_service: CandidateService,
    pub event_service: EventService,
    pub message_service: MessageService,
}

impl AppState {
    /// Connects the configured store (running migrations for PostgreSQL)
    /// and wires the services.
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        let store: Arc<dyn DocumentStore> = match settings.store_backend {
            StoreBackend::Postgres => {
                let database_url = settings
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL must be set")?;

                let pool = PgPoolOptions::new()
                    .max_connections(settings.database_max_connections)
                    .acquire_timeout(Duration::from_secs(3))
                    .connect(database_url)
                    .await?;

                tracing::info!("✅ Database connection established");

                let store = PgDocumentStore::new(pool);
                store.migrate().await?;
                Arc::new(store)
            }
            StoreBackend::Memory => {
                tracing::warn!("Using the in-memory store; data is lost on shutdown");
                Arc::new(MemoryDocumentStore::new())
            }
        };

        Ok(Self::with_store(settings, store))
    }

    // --- Builds the dependency graph ---
    pub fn with_store(settings: Settings, store: Arc<dyn DocumentStore>) -> Self {
        let settings = Arc::new(settings);

        let users = UserDirectory::new(store.clone());
        let lodges = Repository::new(store.clone(), Collection::Lodges);
        let candidates = Repository::new(store.clone(), Collection::Candidates);
        let events = Repository::new(store.clone(), Collection::Events);
        let messages = Repository::new(store.clone(), Collection::Messages);

        let auth_service = AuthService::new(
            users.clone(),
            settings.jwt_secret.clone(),
            settings.jwt_ttl_hours,
            settings.bcrypt_cost,
        );
        let lodge_service = LodgeService::new(
            lodges.clone(),
            users.clone(),
            settings.district_lodge_name.clone(),
        );
        let member_service = MemberService::new(users.clone(), auth_service.clone());
        let role_service = RoleTransferService::new(users.clone(), lodge_service.clone());
        let candidate_service = CandidateService::new(candidates, lodges.clone());
        let event_service = EventService::new(events, lodges);
        let message_service = MessageService::new(messages, users);

        Self {
            settings,
            store,
            auth_service,
            member_service,
            role_service,
            lodge_service,
            candidate_service,
            event_service,
            message_service,
        }
    }
}
