//! Global composition of regional deployments
//!
//! A [`GlobalApp`] ties one compute backend to every target region:
//!
//! ```text
//!                   ┌───────────────────────────┐
//!  client ────────▶ │ traffic profile (DNS)     │  Performance routing,
//!                   │ health: GET :80/api/ping  │  one endpoint per region
//!                   └─────┬──────────┬──────────┘
//!                         ▼          ▼
//!                   region[0]     region[1] ...    (RegionBuilder)
//!                         │          │
//!                   ┌─────┴──────────┴──────────┐
//!                   │ database account           │  region[0] writes,
//!                   │ geo-replicated, Session    │  the rest replicate
//!                   └───────────────────────────┘
//! ```
//!
//! The backend plugs in through [`DeploymentFactory`]: the factory is asked
//! once for a [`RegionBuilder`] given the shared [`GlobalContext`], and the
//! builder is invoked once per region.

pub mod regions;

use tracing::info;

use crate::error::Result;
use crate::stack::naming::{bounded, TRAFFIC_ENDPOINT_NAME_MAX};
use crate::stack::resources::{
    ConsistencyLevel, ConsistencyPolicy, CosmosAccountArgs, DnsConfig, GeoLocation, MonitorConfig,
    TrafficEndpointArgs, TrafficEndpointType, TrafficProfileArgs, TrafficRoutingMethod,
};
use crate::stack::{Output, ResourceOptions, ResourceRef, Secret, Stack};

pub use regions::Regions;

/// Type token of the component that parents each composition
pub const GLOBAL_APP_TYPE: &str = "geoshort:global:GlobalApp";

/// Path the traffic profile polls on every regional endpoint
pub const HEALTH_PATH: &str = "/api/ping";

/// Port the traffic profile polls on every regional endpoint
pub const HEALTH_PORT: u16 = 80;

/// DNS TTL of the global name, in seconds
pub const DNS_TTL_SECS: u32 = 60;

/// Replication lag bound in seconds
pub const MAX_REPLICATION_LAG_SECS: u32 = 5;

/// Replication lag bound in writes
pub const MAX_STALENESS_PREFIX: u32 = 100;

// ============================================================================
// Contexts and endpoints
// ============================================================================

/// Shared state handed to a backend factory
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Name of the composition (`functions`, `aci`, `vms`)
    pub app_name: String,
    /// Write region, where region-less shared resources live
    pub primary_location: String,
    pub resource_group: ResourceRef,
    pub database_account: ResourceRef,
    /// Options every backend resource is declared with
    pub options: ResourceOptions,
}

impl GlobalContext {
    pub fn resource_group_name(&self) -> Output {
        self.resource_group.output("name")
    }

    pub fn account_name(&self) -> Output {
        self.database_account.output("name")
    }

    /// Database account HTTPS endpoint
    pub fn database_endpoint(&self) -> Output {
        self.database_account.output("endpoint")
    }

    /// Database account master key, only ever handed out as a secret
    pub fn database_master_key(&self) -> Secret<Output> {
        Secret::new(self.database_account.output("primaryMasterKey"))
    }
}

/// Per-region input to a [`RegionBuilder`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionalContext {
    pub location: String,
}

impl RegionalContext {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }
}

/// What a regional deployment exposes to the traffic profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionalEndpoint {
    /// A platform resource the profile can track natively (function app, public IP)
    Platform { resource_id: Output },
    /// Any other reachable host name or URL
    External { url: Output },
}

impl RegionalEndpoint {
    pub fn endpoint_type(&self) -> TrafficEndpointType {
        match self {
            Self::Platform { .. } => TrafficEndpointType::Azure,
            Self::External { .. } => TrafficEndpointType::External,
        }
    }

    pub fn resource_id(&self) -> Option<&Output> {
        match self {
            Self::Platform { resource_id } => Some(resource_id),
            Self::External { .. } => None,
        }
    }

    pub fn url(&self) -> Option<&Output> {
        match self {
            Self::Platform { .. } => None,
            Self::External { url } => Some(url),
        }
    }
}

// ============================================================================
// Backend seams
// ============================================================================

/// Provisions one region's compute and returns its endpoint
pub trait RegionBuilder {
    fn build(&self, stack: &mut Stack, region: &RegionalContext) -> Result<RegionalEndpoint>;
}

impl<F> RegionBuilder for F
where
    F: Fn(&mut Stack, &RegionalContext) -> Result<RegionalEndpoint>,
{
    fn build(&self, stack: &mut Stack, region: &RegionalContext) -> Result<RegionalEndpoint> {
        self(stack, region)
    }
}

/// A compute backend variant
pub trait DeploymentFactory {
    /// Short variant name used in logs
    fn variant(&self) -> &'static str;

    /// Declare the backend's shared resources and return its per-region builder
    fn prepare(&self, stack: &mut Stack, context: &GlobalContext) -> Result<Box<dyn RegionBuilder>>;
}

// ============================================================================
// Composition
// ============================================================================

/// Inputs of [`GlobalApp::compose`]
pub struct GlobalAppArgs<'a> {
    pub resource_group: &'a ResourceRef,
    pub regions: &'a Regions,
    pub factory: &'a dyn DeploymentFactory,
    pub enable_multi_master: bool,
}

/// A regional endpoint registered with the traffic profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredEndpoint {
    pub region: String,
    pub resource: ResourceRef,
    pub endpoint: RegionalEndpoint,
}

/// Result of composing one backend across all regions
#[derive(Debug, Clone)]
pub struct GlobalApp {
    pub name: String,
    pub component: ResourceRef,
    pub database_account: ResourceRef,
    pub traffic_profile: ResourceRef,
    pub endpoints: Vec<RegisteredEndpoint>,
    /// Global URL routing to the preferred region
    pub endpoint: Output,
}

impl GlobalApp {
    /// Declare the database, the traffic profile and every regional deployment.
    ///
    /// Any declaration error aborts the composition and is returned as-is.
    pub fn compose(stack: &mut Stack, name: &str, args: GlobalAppArgs<'_>) -> Result<Self> {
        let GlobalAppArgs {
            resource_group,
            regions,
            factory,
            enable_multi_master,
        } = args;

        info!(
            app = name,
            variant = factory.variant(),
            regions = regions.len(),
            primary = regions.primary(),
            "Composing global app"
        );

        let component = stack.declare_component(GLOBAL_APP_TYPE, name, ResourceOptions::default())?;
        let options = ResourceOptions::default().parent(&component);
        let resource_group_name = resource_group.output("name");

        let database_account = stack.declare(
            format!("cosmos-{name}"),
            &CosmosAccountArgs {
                resource_group_name: resource_group_name.clone(),
                location: regions.primary().to_string(),
                offer_type: "Standard".to_string(),
                kind: "GlobalDocumentDB".to_string(),
                consistency_policy: ConsistencyPolicy {
                    consistency_level: ConsistencyLevel::Session,
                    max_interval_in_seconds: MAX_REPLICATION_LAG_SECS,
                    max_staleness_prefix: MAX_STALENESS_PREFIX,
                },
                geo_locations: geo_locations(regions),
                enable_multiple_write_locations: enable_multi_master,
            },
            options.clone(),
        )?;

        let traffic_profile = stack.declare(
            format!("tm{name}"),
            &TrafficProfileArgs {
                resource_group_name: resource_group_name.clone(),
                traffic_routing_method: TrafficRoutingMethod::Performance,
                dns_configs: vec![DnsConfig {
                    // globally unique subdomain: app name + resource group name
                    relative_name: Output::from(format!("{name}{resource_group_name}")),
                    ttl: DNS_TTL_SECS,
                }],
                monitor_configs: vec![MonitorConfig {
                    protocol: "HTTP".to_string(),
                    port: HEALTH_PORT,
                    path: HEALTH_PATH.to_string(),
                }],
            },
            options.clone(),
        )?;

        let context = GlobalContext {
            app_name: name.to_string(),
            primary_location: regions.primary().to_string(),
            resource_group: resource_group.clone(),
            database_account: database_account.clone(),
            options,
        };
        let builder = factory.prepare(stack, &context)?;

        let mut endpoints = Vec::with_capacity(regions.len());
        for location in regions.iter() {
            let endpoint = builder.build(stack, &RegionalContext::new(location))?;

            let resource = stack.declare(
                bounded(&format!("tm{name}{location}"), TRAFFIC_ENDPOINT_NAME_MAX),
                &TrafficEndpointArgs {
                    resource_group_name: resource_group_name.clone(),
                    profile_name: traffic_profile.output("name"),
                    endpoint_type: endpoint.endpoint_type(),
                    target_resource_id: endpoint.resource_id().cloned(),
                    target: endpoint.url().cloned(),
                    endpoint_location: location.to_string(),
                },
                ResourceOptions::default()
                    .parent(&traffic_profile)
                    .delete_before_replace(),
            )?;

            info!(
                app = name,
                region = location,
                endpoint = resource.name(),
                endpoint_type = ?endpoint.endpoint_type(),
                "Registered regional endpoint"
            );

            endpoints.push(RegisteredEndpoint {
                region: location.to_string(),
                resource,
                endpoint,
            });
        }

        let endpoint = Output::from(format!("http://{}", traffic_profile.output("fqdn")));

        Ok(Self {
            name: name.to_string(),
            component,
            database_account,
            traffic_profile,
            endpoints,
            endpoint,
        })
    }
}

/// Replica locations in list order; index 0 is the write region
pub fn geo_locations(regions: &Regions) -> Vec<GeoLocation> {
    regions
        .iter()
        .enumerate()
        .map(|(priority, location)| GeoLocation {
            location: location.to_string(),
            failover_priority: priority as u32,
        })
        .collect()
}
