//! Shared fixture for the service tests.

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use wardgate_core::config::AppConfig;
use wardgate_core::traits::ManualClock;
use wardgate_database::Stores;
use wardgate_database::memory::MemoryStore;
use wardgate_entity::user::User;

use crate::context::RequestContext;
use crate::identity::CreateUserRequest;
use crate::services::Services;

pub(crate) const PASSWORD: &str = "Ward-round-0742";

pub(crate) struct Fixture {
    pub memory: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub services: Services,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let memory = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap(),
        ));
        let services = Services::build(Stores::from_memory(memory.clone()), &config, clock.clone());
        Self {
            memory,
            clock,
            services,
        }
    }

    pub async fn user(&self, username: &str, phone: &str) -> User {
        self.services
            .identity
            .create_user(&RequestContext::system(), request(username, phone))
            .await
            .unwrap()
    }

    pub async fn superuser(&self, username: &str, phone: &str) -> User {
        self.services
            .identity
            .create_superuser(&RequestContext::system(), request(username, phone))
            .await
            .unwrap()
    }
}

pub(crate) fn request(username: &str, phone: &str) -> CreateUserRequest {
    CreateUserRequest {
        username: username.to_string(),
        phone: phone.to_string(),
        password: PASSWORD.to_string(),
        ..Default::default()
    }
}
