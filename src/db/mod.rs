pub mod task_repository;
pub mod user_repository;

use sled::{Config, Db, Error};

#[derive(Clone)]
pub struct Database {
    pub db: Db,
}

impl Database {
    pub fn new(path: &str) -> Result<Self, Error> {
        let db = sled::open(path)?;
        Ok(Database { db })
    }

    /// Throwaway database, removed from disk when dropped.
    pub fn temporary() -> Result<Self, Error> {
        let db = Config::new().temporary(true).open()?;
        Ok(Database { db })
    }

    pub async fn flush(&self) -> Result<usize, Error> {
        self.db.flush_async().await
    }
}
