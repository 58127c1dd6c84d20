//! Deployment entry point
//!
//! One resource group in the primary region, then the same global
//! composition three times, once per compute variant. Each variant gets its
//! own database account, traffic profile and global URL.

use tracing::info;

use crate::backends::{ContainerBackend, FunctionBackend, ScaleSetBackend, ScaleSetSettings};
use crate::config::DeploymentConfig;
use crate::error::Result;
use crate::global::{DeploymentFactory, GlobalApp, GlobalAppArgs, Regions};
use crate::stack::resources::ResourceGroupArgs;
use crate::stack::{Output, ResourceOptions, ResourceRef, Stack, StackError};

pub const FUNCTIONS_APP: &str = "functions";
pub const CONTAINER_APP: &str = "aci";
pub const SCALESET_APP: &str = "vms";

/// Path appended to every exported global URL
pub const EXPORT_ROUTE: &str = "/cosmos";

/// The declared stack plus the composed apps
#[derive(Debug)]
pub struct Deployment {
    pub stack: Stack,
    pub resource_group: ResourceRef,
    pub apps: Vec<GlobalApp>,
}

impl Deployment {
    pub fn app(&self, name: &str) -> Option<&GlobalApp> {
        self.apps.iter().find(|a| a.name == name)
    }
}

struct Variant<'a> {
    name: &'static str,
    export: &'static str,
    factory: &'a dyn DeploymentFactory,
    enable_multi_master: bool,
}

/// Declare the complete multi-region deployment
pub fn declare(config: &DeploymentConfig) -> Result<Deployment> {
    let list = config.locations.as_deref().ok_or_else(|| {
        StackError::InvalidRegions("no locations configured".to_string())
    })?;
    let regions = Regions::parse(list)?;
    declare_for(config, &regions)
}

/// Declare the deployment for an already validated region list
pub fn declare_for(config: &DeploymentConfig, regions: &Regions) -> Result<Deployment> {
    let mut stack = Stack::new(config.project.as_str(), config.stack.as_str());

    let resource_group = stack.declare(
        config.resource_group.as_str(),
        &ResourceGroupArgs::new(regions.primary()),
        ResourceOptions::default(),
    )?;

    let functions = FunctionBackend;
    let containers = ContainerBackend::default();
    let scale_sets = ScaleSetBackend::new(ScaleSetSettings {
        admin_username: config.vm_admin_username.clone(),
        notify_emails: config.notify_emails.clone(),
        ..ScaleSetSettings::default()
    });

    let variants = [
        Variant {
            name: FUNCTIONS_APP,
            export: "functionsEndpoint",
            factory: &functions,
            enable_multi_master: false,
        },
        Variant {
            name: CONTAINER_APP,
            export: "aciEndpoint",
            factory: &containers,
            enable_multi_master: false,
        },
        Variant {
            name: SCALESET_APP,
            export: "vmssEndpoint",
            factory: &scale_sets,
            enable_multi_master: true,
        },
    ];

    let mut apps = Vec::with_capacity(variants.len());
    for variant in variants {
        let app = GlobalApp::compose(
            &mut stack,
            variant.name,
            GlobalAppArgs {
                resource_group: &resource_group,
                regions,
                factory: variant.factory,
                enable_multi_master: variant.enable_multi_master,
            },
        )?;
        stack.export(variant.export, Output::from(format!("{}{EXPORT_ROUTE}", app.endpoint)));
        apps.push(app);
    }

    info!(
        project = stack.project(),
        stack = stack.stack_name(),
        resources = stack.len(),
        regions = regions.len(),
        "Deployment declared"
    );

    Ok(Deployment {
        stack,
        resource_group,
        apps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_RESOURCE_GROUP;
    use crate::error::{ErrorCategory, GeoshortErrorTrait};

    fn config(locations: &str) -> DeploymentConfig {
        DeploymentConfig {
            locations: Some(locations.to_string()),
            ..DeploymentConfig::default()
        }
    }

    #[test]
    fn test_three_independent_apps() {
        let deployment = declare(&config("westus,eastus")).unwrap();
        assert_eq!(deployment.apps.len(), 3);

        let outputs = deployment.stack.outputs();
        assert_eq!(
            outputs["functionsEndpoint"].as_str(),
            "http://${tmfunctions.fqdn}/cosmos"
        );
        assert_eq!(outputs["aciEndpoint"].as_str(), "http://${tmaci.fqdn}/cosmos");
        assert_eq!(outputs["vmssEndpoint"].as_str(), "http://${tmvms.fqdn}/cosmos");
    }

    #[test]
    fn test_resource_group_in_primary_region() {
        let deployment = declare(&config("eastus,westus")).unwrap();
        let rg = deployment.stack.get(DEFAULT_RESOURCE_GROUP).unwrap();
        assert_eq!(rg.property("/location").unwrap(), "eastus");
    }

    #[test]
    fn test_only_scale_sets_are_multi_master() {
        let deployment = declare(&config("westus")).unwrap();
        let flag = |name: &str| {
            deployment
                .stack
                .get(&format!("cosmos-{name}"))
                .and_then(|r| r.property("/enableMultipleWriteLocations"))
                .and_then(|v| v.as_bool())
        };
        assert_eq!(flag(FUNCTIONS_APP), Some(false));
        assert_eq!(flag(CONTAINER_APP), Some(false));
        assert_eq!(flag(SCALESET_APP), Some(true));
    }

    #[test]
    fn test_invalid_locations_declare_nothing() {
        let err = declare(&config("")).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Config);

        let err = declare(&DeploymentConfig::default()).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Config);
    }
}
