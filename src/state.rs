use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::Store;
use crate::identity::IdentityGateway;
use crate::media::MediaGateway;
use crate::services::{PropertyService, RequirementService, UserService};

/// Shared handles every request handler reaches through `State`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub media: Arc<dyn MediaGateway>,
    pub identity: Arc<dyn IdentityGateway>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        media: Arc<dyn MediaGateway>,
        identity: Arc<dyn IdentityGateway>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self { store, media, identity, config }
    }

    pub fn properties(&self) -> PropertyService {
        PropertyService::new(self.store.clone(), self.media.clone(), self.config.filter.clone())
    }

    pub fn requirements(&self) -> RequirementService {
        RequirementService::new(self.store.clone(), self.config.filter.clone())
    }

    pub fn users(&self) -> UserService {
        UserService::new(self.store.clone(), self.identity.clone())
    }
}
