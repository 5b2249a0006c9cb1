use std::sync::Arc;

use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::config::{ClientConfig, TimingConfig};
use crate::gateway::{Gateway, HttpTransport, Transport};
use crate::meals::dto::MealSlot;

/// Identity and wiring for one session. The meal slot is fixed for the
/// session's lifetime.
#[derive(Clone)]
pub struct SessionContext {
    pub session_id: Uuid,
    pub user_id: Arc<str>,
    pub meal_slot: MealSlot,
    pub active_day: Date,
    pub config: Arc<ClientConfig>,
    pub gateway: Gateway,
}

impl SessionContext {
    pub fn init(config: ClientConfig, meal_slot: MealSlot) -> anyhow::Result<Self> {
        if config.user_id.trim().is_empty() {
            anyhow::bail!("user id must not be empty");
        }
        let transport = Arc::new(HttpTransport::new(&config.base_url)) as Arc<dyn Transport>;
        Ok(Self::from_parts(Arc::new(config), meal_slot, transport))
    }

    pub fn from_parts(
        config: Arc<ClientConfig>,
        meal_slot: MealSlot,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user_id: Arc::from(config.user_id.as_str()),
            meal_slot,
            active_day: OffsetDateTime::now_utc().date(),
            config,
            gateway: Gateway::new(transport),
        }
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.config.timing
    }

    #[cfg(test)]
    pub(crate) fn fake(
        meal_slot: MealSlot,
    ) -> (Arc<crate::gateway::scripted::ScriptedTransport>, Self) {
        let transport = Arc::new(crate::gateway::scripted::ScriptedTransport::new());
        let config = Arc::new(ClientConfig {
            base_url: "http://fake.local".into(),
            user_id: "user_123".into(),
            ..ClientConfig::default()
        });
        let ctx = Self::from_parts(config, meal_slot, transport.clone() as Arc<dyn Transport>);
        (transport, ctx)
    }
}
