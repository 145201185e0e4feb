//! # Guest store
//!
//! Whole-document persistence: the entire guest collection is one
//! serialized JSON string under one Redis key. [`GuestStore`] keeps call
//! sites oblivious to that, so per-record storage could be swapped in later
//! without touching the handlers.
//!
//! There is no locking and no compare-and-swap between `get` and `set`; two
//! interleaved read-modify-write cycles race and the later `set` wins.
use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::{ConnectionManager, ConnectionManagerConfig}};

use crate::guests::GuestCollection;

#[async_trait]
pub trait GuestStore: Send + Sync {
    /// Fetch and parse the document; `None` when it was never initialized.
    async fn get(&self) -> Result<Option<GuestCollection>>;

    /// Serialize and write the whole document back.
    async fn set(&self, collection: &GuestCollection) -> Result<()>;
}

pub struct RedisStore {
    connection: ConnectionManager,
    key: String,
}

impl RedisStore {
    pub async fn connect(redis_url: &str, key: &str) -> Result<Self> {
        let config = ConnectionManagerConfig::new().set_number_of_retries(1);

        let client = Client::open(redis_url)?;
        let connection = client.get_connection_manager_with_config(config).await?;

        Ok(Self {
            connection,
            key: key.to_string(),
        })
    }
}

#[async_trait]
impl GuestStore for RedisStore {
    async fn get(&self) -> Result<Option<GuestCollection>> {
        let mut connection = self.connection.clone();

        let raw: Option<String> = connection.get(&self.key).await?;

        match raw {
            Some(raw) => {
                let collection = serde_json::from_str(&raw)
                    .context("stored guest document is not valid JSON")?;
                Ok(Some(collection))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, collection: &GuestCollection) -> Result<()> {
        let raw = serde_json::to_string(collection)?;

        let mut connection = self.connection.clone();
        let _: () = connection.set(&self.key, raw).await?;

        Ok(())
    }
}

/// Test stand-in for Redis. Goes through the same serialize/parse cycle so
/// tests exercise the real wire shape of the document.
#[cfg(test)]
pub struct MemoryStore(std::sync::Mutex<Option<String>>);

#[cfg(test)]
impl MemoryStore {
    pub fn empty() -> Self {
        Self(std::sync::Mutex::new(None))
    }
}

#[cfg(test)]
#[async_trait]
impl GuestStore for MemoryStore {
    async fn get(&self) -> Result<Option<GuestCollection>> {
        let raw = self.0.lock().unwrap().clone();

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, collection: &GuestCollection) -> Result<()> {
        *self.0.lock().unwrap() = Some(serde_json::to_string(collection)?);
        Ok(())
    }
}
