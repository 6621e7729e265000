//! Where the stage gets its catalog from.

use std::future::Future;

use talkmeta_program::ProgramReader;
use talkmeta_shared::{Catalog, FetchOptions, Result};

/// Builds the talk catalog for a program address.
///
/// Called once per run, before any row is processed. Errors are not
/// retried by the stage.
pub trait CatalogProvider {
    fn load_catalog(&self, address: &str) -> impl Future<Output = Result<Catalog>> + Send;
}

/// Fetches and parses the program with [`ProgramReader`].
#[derive(Debug, Clone, Default)]
pub struct ProgramCatalogProvider {
    options: FetchOptions,
}

impl ProgramCatalogProvider {
    pub fn new(options: FetchOptions) -> Self {
        Self { options }
    }
}

impl CatalogProvider for ProgramCatalogProvider {
    async fn load_catalog(&self, address: &str) -> Result<Catalog> {
        let mut reader = ProgramReader::new(address, &self.options)?;
        reader.parse().await?;
        Ok(reader.into_catalog())
    }
}

/// A fixed catalog, whatever the address.
impl CatalogProvider for Catalog {
    async fn load_catalog(&self, _address: &str) -> Result<Catalog> {
        Ok(self.clone())
    }
}
