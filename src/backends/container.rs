//! Container variant: one image, one container group per region
//!
//! Groups are named `<app>-grp-<region>` so no region name can land on the
//! shared `<app>-image`, `<app>-db` or `<app>-items` resources.
//!
//! The image is built from `container/Dockerfile` and pushed to a registry
//! declared once per composition. Database coordinates reach the container
//! as environment variables; the master key travels as a secure
//! environment variable.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::Result;
use crate::global::{DeploymentFactory, GlobalContext, RegionBuilder, RegionalContext, RegionalEndpoint};
use crate::service::config::ENV_MASTER_KEY;
use crate::stack::resources::{
    ContainerGroupArgs, ContainerPort, ContainerSpec, DockerBuild, ImageArgs, RegistryArgs,
    RegistryCredential,
};
use crate::stack::{Output, ResourceRef, Secret, Stack};

use super::DatabasePair;

/// Port the lookup service listens on inside the container
pub const CONTAINER_PORT: u16 = 80;

#[derive(Debug, Clone)]
pub struct ContainerBackend {
    /// Image repository name inside the registry
    pub repository: String,
    /// Image tag
    pub tag: String,
    /// Docker build context, relative to the project root
    pub build_context: String,
    pub dockerfile: String,
    pub cpu: f64,
    pub memory_gb: f64,
}

impl Default for ContainerBackend {
    fn default() -> Self {
        Self {
            repository: "geoshort".to_string(),
            tag: format!("v{}", env!("CARGO_PKG_VERSION")),
            build_context: ".".to_string(),
            dockerfile: "container/Dockerfile".to_string(),
            cpu: 0.5,
            memory_gb: 1.5,
        }
    }
}

impl DeploymentFactory for ContainerBackend {
    fn variant(&self) -> &'static str {
        "container"
    }

    fn prepare(&self, stack: &mut Stack, context: &GlobalContext) -> Result<Box<dyn RegionBuilder>> {
        let registry = stack.declare(
            format!("{}registry", context.app_name),
            &RegistryArgs {
                resource_group_name: context.resource_group_name(),
                location: context.primary_location.clone(),
                admin_enabled: true,
                sku: "Premium".to_string(),
            },
            context.options.clone(),
        )?;

        let image = stack.declare(
            format!("{}-image", context.app_name),
            &ImageArgs {
                image_name: Output::from(format!(
                    "{}/{}:{}",
                    registry.output("loginServer"),
                    self.repository,
                    self.tag
                )),
                build: DockerBuild {
                    context: self.build_context.clone(),
                    dockerfile: self.dockerfile.clone(),
                },
                registry: registry_credential(&registry),
            },
            context.options.clone(),
        )?;

        let pair = DatabasePair::declare(stack, context)?;
        super::warn_master_key_exposure(self.variant(), "secure environment variable");

        Ok(Box::new(ContainerRegionBuilder {
            context: context.clone(),
            settings: self.clone(),
            registry,
            image,
            pair,
        }))
    }
}

fn registry_credential(registry: &ResourceRef) -> RegistryCredential {
    RegistryCredential {
        server: registry.output("loginServer"),
        username: registry.output("adminUsername"),
        password: Secret::new(registry.output("adminPassword")),
    }
}

struct ContainerRegionBuilder {
    context: GlobalContext,
    settings: ContainerBackend,
    registry: ResourceRef,
    image: ResourceRef,
    pair: DatabasePair,
}

impl RegionBuilder for ContainerRegionBuilder {
    fn build(&self, stack: &mut Stack, region: &RegionalContext) -> Result<RegionalEndpoint> {
        let ctx = &self.context;
        let location = region.location.as_str();

        let secure = BTreeMap::from([(ENV_MASTER_KEY.to_string(), ctx.database_master_key())]);
        let dns_name_label = format!("{}-{}-{location}", stack.project(), ctx.app_name);

        let group = stack.declare(
            format!("{}-grp-{location}", ctx.app_name),
            &ContainerGroupArgs {
                resource_group_name: ctx.resource_group_name(),
                location: location.to_string(),
                os_type: "Linux".to_string(),
                ip_address_type: "Public".to_string(),
                dns_name_label,
                image_registry_credentials: vec![registry_credential(&self.registry)],
                containers: vec![ContainerSpec {
                    name: "lookup".to_string(),
                    image: self.image.output("imageName"),
                    cpu: self.settings.cpu,
                    memory: self.settings.memory_gb,
                    ports: vec![ContainerPort {
                        port: CONTAINER_PORT,
                        protocol: "TCP".to_string(),
                    }],
                    environment_variables: self.pair.coordinates(ctx, region),
                    secure_environment_variables: secure,
                }],
            },
            ctx.options.clone().delete_before_replace(),
        )?;

        debug!(region = location, group = group.name(), "Declared container group");

        Ok(RegionalEndpoint::External {
            url: group.output("fqdn"),
        })
    }
}
