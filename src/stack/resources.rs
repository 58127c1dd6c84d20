//! Typed arguments for the provider resources this project declares
//!
//! Field names serialize in camelCase, matching the provider schema the
//! provisioning engine expects. Optional fields are omitted when unset.

use std::collections::BTreeMap;

use serde::Serialize;

use super::{Output, ResourceArgs, Secret, SettingValue};

// ============================================================================
// Core
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupArgs {
    pub location: String,
}

impl ResourceGroupArgs {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }
}

impl ResourceArgs for ResourceGroupArgs {
    const TYPE: &'static str = "azure:core/resourceGroup:ResourceGroup";
}

// ============================================================================
// Cosmos DB
// ============================================================================

/// Consistency level of the database account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConsistencyLevel {
    Strong,
    BoundedStaleness,
    Session,
    ConsistentPrefix,
    Eventual,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyPolicy {
    pub consistency_level: ConsistencyLevel,
    pub max_interval_in_seconds: u32,
    pub max_staleness_prefix: u32,
}

/// One replica location; priority 0 is the write region
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoLocation {
    pub location: String,
    pub failover_priority: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CosmosAccountArgs {
    pub resource_group_name: Output,
    pub location: String,
    pub offer_type: String,
    pub kind: String,
    pub consistency_policy: ConsistencyPolicy,
    pub geo_locations: Vec<GeoLocation>,
    pub enable_multiple_write_locations: bool,
}

impl ResourceArgs for CosmosAccountArgs {
    const TYPE: &'static str = "azure:cosmosdb/account:Account";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlDatabaseArgs {
    pub resource_group_name: Output,
    pub account_name: Output,
}

impl ResourceArgs for SqlDatabaseArgs {
    const TYPE: &'static str = "azure:cosmosdb/sqlDatabase:SqlDatabase";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlContainerArgs {
    pub resource_group_name: Output,
    pub account_name: Output,
    pub database_name: Output,
    pub partition_key_path: String,
}

impl ResourceArgs for SqlContainerArgs {
    const TYPE: &'static str = "azure:cosmosdb/sqlContainer:SqlContainer";
}

// ============================================================================
// Traffic Manager
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrafficRoutingMethod {
    Performance,
    Priority,
    Weighted,
    Geographic,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsConfig {
    pub relative_name: Output,
    pub ttl: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorConfig {
    pub protocol: String,
    pub port: u16,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficProfileArgs {
    pub resource_group_name: Output,
    pub traffic_routing_method: TrafficRoutingMethod,
    pub dns_configs: Vec<DnsConfig>,
    pub monitor_configs: Vec<MonitorConfig>,
}

impl ResourceArgs for TrafficProfileArgs {
    const TYPE: &'static str = "azure:trafficmanager/profile:Profile";
}

/// How a regional backend is registered with the traffic profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrafficEndpointType {
    #[serde(rename = "azureEndpoints")]
    Azure,
    #[serde(rename = "externalEndpoints")]
    External,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficEndpointArgs {
    pub resource_group_name: Output,
    pub profile_name: Output,
    #[serde(rename = "type")]
    pub endpoint_type: TrafficEndpointType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_resource_id: Option<Output>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Output>,
    pub endpoint_location: String,
}

impl ResourceArgs for TrafficEndpointArgs {
    const TYPE: &'static str = "azure:trafficmanager/endpoint:Endpoint";
}

// ============================================================================
// Functions
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAccountArgs {
    pub resource_group_name: Output,
    pub location: String,
    pub account_tier: String,
    pub account_replication_type: String,
}

impl ResourceArgs for StorageAccountArgs {
    const TYPE: &'static str = "azure:storage/account:Account";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSku {
    pub tier: String,
    pub size: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppServicePlanArgs {
    pub resource_group_name: Output,
    pub location: String,
    pub kind: String,
    pub reserved: bool,
    pub sku: PlanSku,
}

impl ResourceArgs for AppServicePlanArgs {
    const TYPE: &'static str = "azure:appservice/plan:Plan";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionAppArgs {
    pub resource_group_name: Output,
    pub location: String,
    pub app_service_plan_id: Output,
    pub storage_account_name: Output,
    pub storage_account_access_key: Secret<Output>,
    pub os_type: String,
    pub version: String,
    pub app_settings: BTreeMap<String, SettingValue>,
}

impl ResourceArgs for FunctionAppArgs {
    const TYPE: &'static str = "azure:appservice/functionApp:FunctionApp";
}

// ============================================================================
// Containers
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryArgs {
    pub resource_group_name: Output,
    pub location: String,
    pub admin_enabled: bool,
    pub sku: String,
}

impl ResourceArgs for RegistryArgs {
    const TYPE: &'static str = "azure:containerservice/registry:Registry";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerBuild {
    pub context: String,
    pub dockerfile: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryCredential {
    pub server: Output,
    pub username: Output,
    pub password: Secret<Output>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageArgs {
    pub image_name: Output,
    pub build: DockerBuild,
    pub registry: RegistryCredential,
}

impl ResourceArgs for ImageArgs {
    const TYPE: &'static str = "docker:index/image:Image";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    pub port: u16,
    pub protocol: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSpec {
    pub name: String,
    pub image: Output,
    pub cpu: f64,
    pub memory: f64,
    pub ports: Vec<ContainerPort>,
    pub environment_variables: BTreeMap<String, Output>,
    pub secure_environment_variables: BTreeMap<String, Secret<Output>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerGroupArgs {
    pub resource_group_name: Output,
    pub location: String,
    pub os_type: String,
    pub ip_address_type: String,
    pub dns_name_label: String,
    pub image_registry_credentials: Vec<RegistryCredential>,
    pub containers: Vec<ContainerSpec>,
}

impl ResourceArgs for ContainerGroupArgs {
    const TYPE: &'static str = "azure:containerservice/group:Group";
}

// ============================================================================
// Networking
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIpArgs {
    pub resource_group_name: Output,
    pub location: String,
    pub allocation_method: String,
    pub domain_name_label: String,
}

impl ResourceArgs for PublicIpArgs {
    const TYPE: &'static str = "azure:network/publicIp:PublicIp";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontendIpConfiguration {
    pub name: String,
    pub public_ip_address_id: Output,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerArgs {
    pub resource_group_name: Output,
    pub location: String,
    pub frontend_ip_configurations: Vec<FrontendIpConfiguration>,
}

impl ResourceArgs for LoadBalancerArgs {
    const TYPE: &'static str = "azure:lb/loadBalancer:LoadBalancer";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendAddressPoolArgs {
    pub loadbalancer_id: Output,
}

impl ResourceArgs for BackendAddressPoolArgs {
    const TYPE: &'static str = "azure:lb/backendAddressPool:BackendAddressPool";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeArgs {
    pub loadbalancer_id: Output,
    pub protocol: String,
    pub port: u16,
}

impl ResourceArgs for ProbeArgs {
    const TYPE: &'static str = "azure:lb/probe:Probe";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerRuleArgs {
    pub loadbalancer_id: Output,
    pub backend_address_pool_ids: Vec<Output>,
    pub frontend_ip_configuration_name: String,
    pub frontend_port: u16,
    pub backend_port: u16,
    pub probe_id: Output,
    pub protocol: String,
}

impl ResourceArgs for LoadBalancerRuleArgs {
    const TYPE: &'static str = "azure:lb/rule:Rule";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkArgs {
    pub resource_group_name: Output,
    pub location: String,
    pub address_spaces: Vec<String>,
}

impl ResourceArgs for VirtualNetworkArgs {
    const TYPE: &'static str = "azure:network/virtualNetwork:VirtualNetwork";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetArgs {
    pub resource_group_name: Output,
    pub virtual_network_name: Output,
    pub address_prefixes: Vec<String>,
}

impl ResourceArgs for SubnetArgs {
    const TYPE: &'static str = "azure:network/subnet:Subnet";
}

// ============================================================================
// Compute
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IpConfiguration {
    pub name: String,
    pub primary: bool,
    pub subnet_id: Output,
    pub load_balancer_backend_address_pool_ids: Vec<Output>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkProfile {
    pub name: String,
    pub primary: bool,
    pub ip_configurations: Vec<IpConfiguration>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OsProfile {
    pub computer_name_prefix: String,
    pub admin_username: String,
    pub admin_password: Secret<Output>,
    pub custom_data: Secret<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OsProfileLinuxConfig {
    pub disable_password_authentication: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleSetSku {
    pub name: String,
    pub tier: String,
    pub capacity: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageReference {
    pub publisher: String,
    pub offer: String,
    pub sku: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OsDisk {
    pub caching: String,
    pub create_option: String,
    pub managed_disk_type: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataDisk {
    pub lun: u32,
    pub caching: String,
    pub create_option: String,
    pub disk_size_gb: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleSetArgs {
    pub resource_group_name: Output,
    pub location: String,
    pub upgrade_policy_mode: String,
    pub sku: ScaleSetSku,
    pub os_profile: OsProfile,
    pub os_profile_linux_config: OsProfileLinuxConfig,
    pub network_profiles: Vec<NetworkProfile>,
    pub storage_profile_image_reference: ImageReference,
    pub storage_profile_os_disk: OsDisk,
    pub storage_profile_data_disks: Vec<DataDisk>,
}

impl ResourceArgs for ScaleSetArgs {
    const TYPE: &'static str = "azure:compute/scaleSet:ScaleSet";
}

// ============================================================================
// Monitoring
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ComparisonOperator {
    GreaterThan,
    LessThan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScaleDirection {
    Increase,
    Decrease,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricTrigger {
    pub metric_name: String,
    pub metric_resource_id: Output,
    pub operator: ComparisonOperator,
    pub statistic: String,
    pub threshold: f64,
    pub time_aggregation: String,
    pub time_grain: String,
    pub time_window: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleAction {
    pub direction: ScaleDirection,
    #[serde(rename = "type")]
    pub action_type: String,
    pub value: u32,
    pub cooldown: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleRule {
    pub metric_trigger: MetricTrigger,
    pub scale_action: ScaleAction,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoscaleCapacity {
    pub default: u32,
    pub minimum: u32,
    pub maximum: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoscaleProfile {
    pub name: String,
    pub capacity: AutoscaleCapacity,
    pub rules: Vec<ScaleRule>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailNotification {
    pub send_to_subscription_administrator: bool,
    pub send_to_subscription_co_administrator: bool,
    pub custom_emails: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoscaleNotification {
    pub email: EmailNotification,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoscaleSettingArgs {
    pub resource_group_name: Output,
    pub location: String,
    pub target_resource_id: Output,
    pub profiles: Vec<AutoscaleProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<AutoscaleNotification>,
}

impl ResourceArgs for AutoscaleSettingArgs {
    const TYPE: &'static str = "azure:monitoring/autoscaleSetting:AutoscaleSetting";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_type_wire_names() {
        assert_eq!(
            serde_json::to_value(TrafficEndpointType::Azure).unwrap(),
            "azureEndpoints"
        );
        assert_eq!(
            serde_json::to_value(TrafficEndpointType::External).unwrap(),
            "externalEndpoints"
        );
    }

    #[test]
    fn test_endpoint_omits_unset_target() {
        let args = TrafficEndpointArgs {
            resource_group_name: Output::literal("rg"),
            profile_name: Output::literal("tm"),
            endpoint_type: TrafficEndpointType::External,
            target_resource_id: None,
            target: Some(Output::literal("example.org")),
            endpoint_location: "westus".to_string(),
        };
        let json = serde_json::to_value(&args).unwrap();
        assert!(json.get("targetResourceId").is_none());
        assert_eq!(json["target"], "example.org");
        assert_eq!(json["type"], "externalEndpoints");
    }

    #[test]
    fn test_consistency_policy_camel_case() {
        let policy = ConsistencyPolicy {
            consistency_level: ConsistencyLevel::Session,
            max_interval_in_seconds: 5,
            max_staleness_prefix: 100,
        };
        let json = serde_json::to_value(&policy).unwrap();
        assert_eq!(json["consistencyLevel"], "Session");
        assert_eq!(json["maxIntervalInSeconds"], 5);
        assert_eq!(json["maxStalenessPrefix"], 100);
    }
}
