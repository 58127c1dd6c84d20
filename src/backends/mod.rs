//! Regional deployment builders
//!
//! Three interchangeable [`DeploymentFactory`](crate::global::DeploymentFactory)
//! implementations:
//!
//! - [`function::FunctionBackend`] - serverless function app per region
//! - [`container::ContainerBackend`] - container group per region, one shared image
//! - [`scaleset::ScaleSetBackend`] - load-balanced, autoscaled VM scale set per region
//!
//! Each variant owns an isolated logical database and collection under the
//! shared database account, so the variants never see each other's records.

pub mod autoscale;
pub mod container;
pub mod function;
pub mod scaleset;

use std::collections::BTreeMap;

use crate::error::Result;
use crate::global::{GlobalContext, RegionalContext};
use crate::service::config::{ENV_COLLECTION, ENV_DATABASE, ENV_ENDPOINT, ENV_LOCATION};
use crate::stack::resources::{SqlContainerArgs, SqlDatabaseArgs};
use crate::stack::{Output, ResourceRef, Stack};

pub use container::ContainerBackend;
pub use function::FunctionBackend;
pub use scaleset::{ScaleSetBackend, ScaleSetSettings};

/// Partition key of every provisioned collection; lookups address documents by id
pub const PARTITION_KEY_PATH: &str = "/id";

/// Logical database + collection owned by one backend variant
#[derive(Debug, Clone)]
pub struct DatabasePair {
    pub database: ResourceRef,
    pub collection: ResourceRef,
}

impl DatabasePair {
    /// Declare `<app>-db` and `<app>-items` under the shared account
    pub fn declare(stack: &mut Stack, context: &GlobalContext) -> Result<Self> {
        let database = stack.declare(
            format!("{}-db", context.app_name),
            &SqlDatabaseArgs {
                resource_group_name: context.resource_group_name(),
                account_name: context.account_name(),
            },
            context.options.clone(),
        )?;

        let collection = stack.declare(
            format!("{}-items", context.app_name),
            &SqlContainerArgs {
                resource_group_name: context.resource_group_name(),
                account_name: context.account_name(),
                database_name: database.output("name"),
                partition_key_path: PARTITION_KEY_PATH.to_string(),
            },
            context.options.clone(),
        )?;

        Ok(Self {
            database,
            collection,
        })
    }

    /// Non-secret half of the compute-to-database contract
    pub fn coordinates(
        &self,
        context: &GlobalContext,
        region: &RegionalContext,
    ) -> BTreeMap<String, Output> {
        BTreeMap::from([
            (ENV_ENDPOINT.to_string(), context.database_endpoint()),
            (ENV_DATABASE.to_string(), self.database.output("name")),
            (ENV_COLLECTION.to_string(), self.collection.output("name")),
            (ENV_LOCATION.to_string(), Output::literal(region.location.as_str())),
        ])
    }
}

/// Log that a variant hands the raw master key to its compute instances
fn warn_master_key_exposure(variant: &str, channel: &str) {
    tracing::warn!(
        variant = variant,
        channel = channel,
        "Database master key is delivered to compute instances; prefer a read-only key or managed identity"
    );
}
