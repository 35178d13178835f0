use std::path::PathBuf;

use anyhow::ensure;
use serde::{Deserialize, Serialize};

/// Longest identifier Postgres accepts without truncating it.
pub const POSTGRES_MAX_IDENTIFIER_LEN: usize = 63;

/// Configuration of the tenancy module (`tenancy` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TenancyConfig {
    /// Maximum tenant id length; ids double as database names.
    pub max_id_length: usize,
    pub provisioning: ProvisioningConfig,
    pub pipelines: PipelinesConfig,
    pub worker: WorkerConfig,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            max_id_length: 64,
            provisioning: ProvisioningConfig::default(),
            pipelines: PipelinesConfig::default(),
            worker: WorkerConfig::default(),
        }
    }
}

impl TenancyConfig {
    /// Reject settings under which a valid tenant id could map to a database
    /// name the selected driver cannot hold.
    ///
    /// # Errors
    /// Returns an error naming the offending settings.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.max_id_length > 0, "tenancy.max_id_length must be positive");
        if self.provisioning.driver == ProvisionerDriver::Postgres {
            let longest = self.provisioning.database_prefix.len()
                + self.provisioning.database_suffix.len()
                + self.max_id_length;
            ensure!(
                longest <= POSTGRES_MAX_IDENTIFIER_LEN,
                "database names may reach {longest} bytes (prefix + max_id_length + suffix) \
                 but postgres identifiers are limited to {POSTGRES_MAX_IDENTIFIER_LEN}"
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvisionerDriver {
    /// One SQLite file per tenant.
    #[default]
    Sqlite,
    /// One database per tenant on the central Postgres server.
    Postgres,
    /// Bookkeeping only, nothing is created.
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvisioningConfig {
    pub driver: ProvisionerDriver,
    /// Directory holding tenant SQLite files.
    pub sqlite_dir: PathBuf,
    pub database_prefix: String,
    pub database_suffix: String,
    /// Add the seeding step to the creation pipeline.
    pub seed: bool,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            driver: ProvisionerDriver::default(),
            sqlite_dir: PathBuf::from("tenants"),
            database_prefix: "tenant_".to_owned(),
            database_suffix: String::new(),
            seed: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelinesConfig {
    pub created: PipelineConfig,
    pub deleted: PipelineConfig,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Deliver through the background job worker.
    pub queued: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkerConfig {
    pub concurrency: usize,
    pub queue_capacity: usize,
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
    /// Finished jobs whose final state stays queryable.
    pub retained_jobs: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            queue_capacity: 1024,
            max_attempts: 3,
            retry_backoff_ms: 200,
            retained_jobs: 1024,
        }
    }
}
