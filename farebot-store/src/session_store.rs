use async_trait::async_trait;
use dashmap::DashMap;
use farebot_core::contract::SessionStore;
use farebot_core::Session;

/// Process-wide session map. Ephemeral by design: in-flight dialogues are
/// lost on restart. Concurrent same-user writes resolve last-write-wins.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, Session>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(
        &self,
        user_id: &str,
    ) -> Result<Option<Session>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.sessions.get(user_id).map(|entry| entry.clone()))
    }

    async fn put(
        &self,
        user_id: &str,
        session: Session,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.sessions.insert(user_id.to_string(), session);
        Ok(())
    }

    async fn delete(
        &self,
        user_id: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.sessions.remove(user_id);
        Ok(())
    }
}
