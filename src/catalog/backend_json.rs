use std::path::Path;

use super::{CatalogBackend, Result, Tables};
use crate::storage::{BackendLocal, StorageManager};

const DOCUMENT: &str = "catalog.json";

/// Document-store backend: every collection lives in one JSON document.
pub struct BackendJson {
    store: BackendLocal,
}

impl BackendJson {
    pub fn new(dir: &Path) -> Result<Self> {
        Ok(Self {
            store: BackendLocal::new(dir)?,
        })
    }
}

impl CatalogBackend for BackendJson {
    fn load(&self) -> Result<Tables> {
        if !self.store.exists(DOCUMENT) {
            log::info!("Creating new database at {}", self.store.path(DOCUMENT).display());
            let tables = Tables::default();
            self.save(&tables)?;
            return Ok(tables);
        }

        let data = self.store.read(DOCUMENT)?;
        Ok(serde_json::from_slice(&data)?)
    }

    fn save(&self, tables: &Tables) -> Result<()> {
        let data = serde_json::to_vec_pretty(tables)?;
        self.store.write(DOCUMENT, &data)?;
        Ok(())
    }
}
