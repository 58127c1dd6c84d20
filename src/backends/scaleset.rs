//! VM scale set variant
//!
//! Per region: public IP, load balancer (frontend, backend pool, TCP probe,
//! port 80 rule), virtual network with one subnet, a Linux scale set joined
//! to the backend pool and a CPU autoscale setting. Instances boot with a
//! cloud-init document that writes the service environment and installs the
//! `geoshort serve` unit.

use std::collections::BTreeMap;

use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::global::{DeploymentFactory, GlobalContext, RegionBuilder, RegionalContext, RegionalEndpoint};
use crate::stack::naming::{bounded, PROBE_NAME_MAX};
use crate::stack::resources::{
    AutoscaleNotification, AutoscaleSettingArgs, BackendAddressPoolArgs, DataDisk,
    EmailNotification, FrontendIpConfiguration, ImageReference, IpConfiguration,
    LoadBalancerArgs, LoadBalancerRuleArgs, NetworkProfile, OsDisk, OsProfile,
    OsProfileLinuxConfig, ProbeArgs, PublicIpArgs, ScaleSetArgs, ScaleSetSku, SubnetArgs,
    VirtualNetworkArgs,
};
use crate::stack::{Output, ResourceRef, Secret, Stack};

use super::{autoscale, DatabasePair};

const CUSTOM_DATA_TEMPLATE: &str = include_str!("../../templates/vm_custom_data.yaml");
const CUSTOM_DATA_NAME: &str = "vm_custom_data";

/// Stack config key holding the scale set admin password
pub const ADMIN_PASSWORD_CONFIG: &str = "vmAdminPassword";
/// Stack config key holding the download URL of the service binary
pub const ARTIFACT_URL_CONFIG: &str = "vmArtifactUrl";

pub const FRONTEND_NAME: &str = "PublicIPAddress";
pub const SERVICE_PORT: u16 = 80;
pub const VNET_ADDRESS_SPACE: &str = "10.0.0.0/16";
pub const SUBNET_PREFIX: &str = "10.0.2.0/24";

#[derive(Debug, Clone)]
pub struct ScaleSetSettings {
    pub admin_username: String,
    pub vm_size: String,
    pub vm_tier: String,
    pub initial_capacity: u32,
    pub data_disk_size_gb: u32,
    /// Extra recipients of autoscale notifications
    pub notify_emails: Vec<String>,
}

impl Default for ScaleSetSettings {
    fn default() -> Self {
        Self {
            admin_username: "geoshort".to_string(),
            vm_size: "Standard_DS1_v2".to_string(),
            vm_tier: "Standard".to_string(),
            initial_capacity: 1,
            data_disk_size_gb: 10,
            notify_emails: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScaleSetBackend {
    pub settings: ScaleSetSettings,
}

impl ScaleSetBackend {
    pub fn new(settings: ScaleSetSettings) -> Self {
        Self { settings }
    }
}

impl DeploymentFactory for ScaleSetBackend {
    fn variant(&self) -> &'static str {
        "scaleset"
    }

    fn prepare(&self, stack: &mut Stack, context: &GlobalContext) -> Result<Box<dyn RegionBuilder>> {
        let pair = DatabasePair::declare(stack, context)?;
        super::warn_master_key_exposure(self.variant(), "instance custom data");

        let mut templates = Handlebars::new();
        templates.set_strict_mode(true);
        templates.register_escape_fn(handlebars::no_escape);
        templates.register_template_string(CUSTOM_DATA_NAME, CUSTOM_DATA_TEMPLATE)?;

        Ok(Box::new(ScaleSetRegionBuilder {
            context: context.clone(),
            settings: self.settings.clone(),
            pair,
            templates,
        }))
    }
}

#[derive(Serialize)]
struct CustomDataValues<'a> {
    #[serde(flatten)]
    coordinates: &'a BTreeMap<String, Output>,
    #[serde(rename = "MASTER_KEY")]
    master_key: &'a Output,
    #[serde(rename = "ARTIFACT_URL")]
    artifact_url: Output,
}

struct ScaleSetRegionBuilder {
    context: GlobalContext,
    settings: ScaleSetSettings,
    pair: DatabasePair,
    templates: Handlebars<'static>,
}

impl ScaleSetRegionBuilder {
    fn custom_data(&self, region: &RegionalContext) -> Result<Secret<String>> {
        let coordinates = self.pair.coordinates(&self.context, region);
        let master_key = self.context.database_master_key();
        let values = CustomDataValues {
            coordinates: &coordinates,
            master_key: master_key.expose(),
            artifact_url: Output::config_secret(ARTIFACT_URL_CONFIG),
        };
        let rendered = self.templates.render(CUSTOM_DATA_NAME, &values)?;
        Ok(Secret::new(rendered))
    }

    fn notification(&self) -> Option<AutoscaleNotification> {
        if self.settings.notify_emails.is_empty() {
            return None;
        }
        Some(AutoscaleNotification {
            email: EmailNotification {
                send_to_subscription_administrator: true,
                send_to_subscription_co_administrator: true,
                custom_emails: self.settings.notify_emails.clone(),
            },
        })
    }

    fn declare_network(&self, stack: &mut Stack, location: &str) -> Result<RegionNetwork> {
        let ctx = &self.context;
        let opts = &ctx.options;
        let domain_name_label = format!("{}-{}-{location}", stack.project(), ctx.app_name);

        let public_ip = stack.declare(
            format!("pip-{location}"),
            &PublicIpArgs {
                resource_group_name: ctx.resource_group_name(),
                location: location.to_string(),
                allocation_method: "Static".to_string(),
                domain_name_label,
            },
            opts.clone(),
        )?;

        let load_balancer = stack.declare(
            format!("lb-{location}"),
            &LoadBalancerArgs {
                resource_group_name: ctx.resource_group_name(),
                location: location.to_string(),
                frontend_ip_configurations: vec![FrontendIpConfiguration {
                    name: FRONTEND_NAME.to_string(),
                    public_ip_address_id: public_ip.id(),
                }],
            },
            opts.clone(),
        )?;

        let backend_pool = stack.declare(
            format!("bap-{location}"),
            &BackendAddressPoolArgs {
                loadbalancer_id: load_balancer.id(),
            },
            opts.clone(),
        )?;

        let probe = stack.declare(
            bounded(&format!("ssh-probe-{location}"), PROBE_NAME_MAX),
            &ProbeArgs {
                loadbalancer_id: load_balancer.id(),
                protocol: "Tcp".to_string(),
                port: SERVICE_PORT,
            },
            opts.clone(),
        )?;

        stack.declare(
            format!("rule-{location}"),
            &LoadBalancerRuleArgs {
                loadbalancer_id: load_balancer.id(),
                backend_address_pool_ids: vec![backend_pool.id()],
                frontend_ip_configuration_name: FRONTEND_NAME.to_string(),
                frontend_port: SERVICE_PORT,
                backend_port: SERVICE_PORT,
                probe_id: probe.id(),
                protocol: "Tcp".to_string(),
            },
            opts.clone(),
        )?;

        let vnet = stack.declare(
            format!("vnet-{location}"),
            &VirtualNetworkArgs {
                resource_group_name: ctx.resource_group_name(),
                location: location.to_string(),
                address_spaces: vec![VNET_ADDRESS_SPACE.to_string()],
            },
            opts.clone(),
        )?;

        let subnet = stack.declare(
            format!("subnet-{location}"),
            &SubnetArgs {
                resource_group_name: ctx.resource_group_name(),
                virtual_network_name: vnet.output("name"),
                address_prefixes: vec![SUBNET_PREFIX.to_string()],
            },
            opts.clone(),
        )?;

        Ok(RegionNetwork {
            public_ip,
            backend_pool,
            subnet,
        })
    }
}

struct RegionNetwork {
    public_ip: ResourceRef,
    backend_pool: ResourceRef,
    subnet: ResourceRef,
}

impl RegionBuilder for ScaleSetRegionBuilder {
    fn build(&self, stack: &mut Stack, region: &RegionalContext) -> Result<RegionalEndpoint> {
        let ctx = &self.context;
        let location = region.location.as_str();
        let network = self.declare_network(stack, location)?;
        let custom_data = self.custom_data(region)?;

        let scale_set = stack.declare(
            format!("vmss-{location}"),
            &ScaleSetArgs {
                resource_group_name: ctx.resource_group_name(),
                location: location.to_string(),
                upgrade_policy_mode: "Automatic".to_string(),
                sku: ScaleSetSku {
                    name: self.settings.vm_size.clone(),
                    tier: self.settings.vm_tier.clone(),
                    capacity: self.settings.initial_capacity,
                },
                os_profile: OsProfile {
                    computer_name_prefix: "vmlab".to_string(),
                    admin_username: self.settings.admin_username.clone(),
                    admin_password: Secret::new(Output::config_secret(ADMIN_PASSWORD_CONFIG)),
                    custom_data,
                },
                os_profile_linux_config: OsProfileLinuxConfig {
                    disable_password_authentication: false,
                },
                network_profiles: vec![NetworkProfile {
                    name: "networkprofile".to_string(),
                    primary: true,
                    ip_configurations: vec![IpConfiguration {
                        name: "IPConfiguration".to_string(),
                        primary: true,
                        subnet_id: network.subnet.id(),
                        load_balancer_backend_address_pool_ids: vec![network.backend_pool.id()],
                    }],
                }],
                storage_profile_image_reference: ImageReference {
                    publisher: "Canonical".to_string(),
                    offer: "UbuntuServer".to_string(),
                    sku: "18.04-LTS".to_string(),
                    version: "latest".to_string(),
                },
                storage_profile_os_disk: OsDisk {
                    caching: "ReadWrite".to_string(),
                    create_option: "FromImage".to_string(),
                    managed_disk_type: "Standard_LRS".to_string(),
                },
                storage_profile_data_disks: vec![DataDisk {
                    lun: 0,
                    caching: "ReadWrite".to_string(),
                    create_option: "Empty".to_string(),
                    disk_size_gb: self.settings.data_disk_size_gb,
                }],
            },
            ctx.options.clone().depends_on(&network.backend_pool),
        )?;

        let scale_set_id = scale_set.id();
        stack.declare(
            format!("as-{location}"),
            &AutoscaleSettingArgs {
                resource_group_name: ctx.resource_group_name(),
                location: location.to_string(),
                target_resource_id: scale_set_id.clone(),
                profiles: vec![autoscale::cpu_profile(&scale_set_id)],
                notification: self.notification(),
            },
            ctx.options.clone(),
        )?;

        debug!(region = location, scale_set = scale_set.name(), "Declared scale set");

        Ok(RegionalEndpoint::Platform {
            resource_id: network.public_ip.id(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::global::{GlobalApp, GlobalAppArgs, Regions};
    use crate::stack::resources::ResourceGroupArgs;
    use crate::stack::{ResourceArgs, ResourceOptions};

    fn compose_with(regions: &str, backend: ScaleSetBackend) -> (Stack, GlobalApp) {
        let mut stack = Stack::new("geoshort", "test");
        let rg = stack
            .declare("rg", &ResourceGroupArgs::new("westus"), ResourceOptions::default())
            .unwrap();
        let regions = Regions::parse(regions).unwrap();
        let app = GlobalApp::compose(
            &mut stack,
            "vms",
            GlobalAppArgs {
                resource_group: &rg,
                regions: &regions,
                factory: &backend,
                enable_multi_master: true,
            },
        )
        .unwrap();
        (stack, app)
    }

    fn compose(regions: &str) -> (Stack, GlobalApp) {
        compose_with(regions, ScaleSetBackend::default())
    }

    #[test]
    fn test_regional_topology() {
        let (stack, _) = compose("westus");
        for name in [
            "pip-westus",
            "lb-westus",
            "bap-westus",
            "ssh-probe-westus",
            "rule-westus",
            "vnet-westus",
            "subnet-westus",
            "vmss-westus",
            "as-westus",
        ] {
            assert!(stack.get(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn test_probe_name_is_bounded() {
        let (stack, _) = compose("southeastasia,westeurope");
        let probes: Vec<_> = stack.resources_of_type(ProbeArgs::TYPE).collect();
        assert_eq!(probes.len(), 2);
        assert!(probes.iter().all(|p| p.name.len() <= PROBE_NAME_MAX));
        assert_ne!(probes[0].name, probes[1].name);
    }

    #[test]
    fn test_scale_set_joins_backend_pool() {
        let (stack, _) = compose("westus");
        let vmss = stack.get("vmss-westus").unwrap();
        assert!(vmss.dependencies.contains("bap-westus"));
        assert!(vmss.dependencies.contains("subnet-westus"));
        assert_eq!(
            vmss.property("/networkProfiles/0/ipConfigurations/0/loadBalancerBackendAddressPoolIds/0")
                .unwrap(),
            "${bap-westus.id}"
        );
        assert_eq!(vmss.property("/sku/name").unwrap(), "Standard_DS1_v2");
        assert_eq!(vmss.property("/sku/capacity").unwrap(), 1);
    }

    #[test]
    fn test_credentials_are_secret_references() {
        let (stack, _) = compose("westus");
        let vmss = stack.get("vmss-westus").unwrap();
        assert_eq!(
            vmss.property("/osProfile/adminPassword/secret").unwrap(),
            "${config:vmAdminPassword}"
        );

        let custom_data = vmss
            .property("/osProfile/customData/secret")
            .unwrap()
            .as_str()
            .unwrap();
        assert!(custom_data.starts_with("#cloud-config"));
        assert!(custom_data.contains("ENDPOINT=${cosmos-vms.endpoint}"));
        assert!(custom_data.contains("MASTER_KEY=${cosmos-vms.primaryMasterKey}"));
        assert!(custom_data.contains("DATABASE=${vms-db.name}"));
        assert!(custom_data.contains("COLLECTION=${vms-items.name}"));
        assert!(custom_data.contains("LOCATION=westus"));
        assert!(custom_data.contains("${config:vmArtifactUrl}"));

        let required = stack.required_config();
        assert!(required.contains(ADMIN_PASSWORD_CONFIG));
        assert!(required.contains(ARTIFACT_URL_CONFIG));
    }

    #[test]
    fn test_autoscale_targets_scale_set() {
        let (stack, _) = compose("westus");
        let setting = stack.get("as-westus").unwrap();
        assert_eq!(setting.property("/targetResourceId").unwrap(), "${vmss-westus.id}");
        assert_eq!(setting.property("/profiles/0/capacity/maximum").unwrap(), 10);
        assert!(setting.property("/notification").is_none());
    }

    #[test]
    fn test_notification_emails() {
        let backend = ScaleSetBackend::new(ScaleSetSettings {
            notify_emails: vec!["ops@example.com".to_string()],
            ..ScaleSetSettings::default()
        });
        let (stack, _) = compose_with("westus", backend);
        let setting = stack.get("as-westus").unwrap();
        assert_eq!(
            setting.property("/notification/email/customEmails/0").unwrap(),
            "ops@example.com"
        );
    }

    #[test]
    fn test_endpoint_targets_public_ip() {
        let (stack, app) = compose("westus");
        let endpoint = stack.get(app.endpoints[0].resource.name()).unwrap();
        assert_eq!(endpoint.property("/type").unwrap(), "azureEndpoints");
        assert_eq!(
            endpoint.property("/targetResourceId").unwrap(),
            "${pip-westus.id}"
        );
    }
}
