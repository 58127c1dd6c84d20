//! Serverless variant: one function app per region
//!
//! The function app runs the `geoshort serve` binary as a custom handler
//! bound to the route `{key}` with an empty route prefix, so
//! `GET /<key>` lands on the lookup handler directly. The code package
//! (`function/` host files plus the binary, zipped) is mounted from the URL
//! held in the stack config secret `functionPackageUrl`.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::Result;
use crate::global::{DeploymentFactory, GlobalContext, RegionBuilder, RegionalContext, RegionalEndpoint};
use crate::service::config::ENV_MASTER_KEY;
use crate::stack::naming::storage_account_name;
use crate::stack::resources::{AppServicePlanArgs, FunctionAppArgs, PlanSku, StorageAccountArgs};
use crate::stack::{Output, Secret, SettingValue, Stack};

use super::DatabasePair;

/// Stack config secret holding the zipped code package URL
pub const PACKAGE_URL_CONFIG: &str = "functionPackageUrl";

/// App setting the function host mounts its code package from
pub const RUN_FROM_PACKAGE_SETTING: &str = "WEBSITE_RUN_FROM_PACKAGE";

/// Function runtime version
pub const FUNCTIONS_VERSION: &str = "~4";

#[derive(Debug, Clone, Default)]
pub struct FunctionBackend;

impl DeploymentFactory for FunctionBackend {
    fn variant(&self) -> &'static str {
        "function"
    }

    fn prepare(&self, stack: &mut Stack, context: &GlobalContext) -> Result<Box<dyn RegionBuilder>> {
        let pair = DatabasePair::declare(stack, context)?;
        super::warn_master_key_exposure(self.variant(), "secret app setting");
        Ok(Box::new(FunctionRegionBuilder {
            context: context.clone(),
            pair,
        }))
    }
}

struct FunctionRegionBuilder {
    context: GlobalContext,
    pair: DatabasePair,
}

impl RegionBuilder for FunctionRegionBuilder {
    fn build(&self, stack: &mut Stack, region: &RegionalContext) -> Result<RegionalEndpoint> {
        let ctx = &self.context;
        let location = region.location.as_str();

        let storage_name = storage_account_name(&["fn", &ctx.app_name, location]);
        let storage = stack.declare(
            storage_name,
            &StorageAccountArgs {
                resource_group_name: ctx.resource_group_name(),
                location: location.to_string(),
                account_tier: "Standard".to_string(),
                account_replication_type: "LRS".to_string(),
            },
            ctx.options.clone(),
        )?;

        let plan = stack.declare(
            format!("GetUrl-{location}-plan"),
            &AppServicePlanArgs {
                resource_group_name: ctx.resource_group_name(),
                location: location.to_string(),
                kind: "FunctionApp".to_string(),
                reserved: true,
                sku: PlanSku {
                    tier: "Dynamic".to_string(),
                    size: "Y1".to_string(),
                },
            },
            ctx.options.clone(),
        )?;

        let app = stack.declare(
            format!("GetUrl-{location}"),
            &FunctionAppArgs {
                resource_group_name: ctx.resource_group_name(),
                location: location.to_string(),
                app_service_plan_id: plan.id(),
                storage_account_name: storage.output("name"),
                storage_account_access_key: Secret::new(storage.output("primaryAccessKey")),
                os_type: "linux".to_string(),
                version: FUNCTIONS_VERSION.to_string(),
                app_settings: self.app_settings(region),
            },
            ctx.options.clone(),
        )?;

        debug!(region = location, function_app = app.name(), "Declared function app");

        Ok(RegionalEndpoint::Platform {
            resource_id: app.id(),
        })
    }
}

impl FunctionRegionBuilder {
    fn app_settings(&self, region: &RegionalContext) -> BTreeMap<String, SettingValue> {
        let mut settings: BTreeMap<String, SettingValue> = self
            .pair
            .coordinates(&self.context, region)
            .into_iter()
            .map(|(k, v)| (k, SettingValue::from(v)))
            .collect();

        settings.insert(
            ENV_MASTER_KEY.to_string(),
            SettingValue::from(self.context.database_master_key()),
        );
        settings.insert(
            "FUNCTIONS_WORKER_RUNTIME".to_string(),
            Output::literal("custom").into(),
        );
        settings.insert(
            "AzureFunctionsJobHost__extensions__http__routePrefix".to_string(),
            Output::literal("").into(),
        );
        settings.insert(
            RUN_FROM_PACKAGE_SETTING.to_string(),
            SettingValue::from(Secret::new(Output::config_secret(PACKAGE_URL_CONFIG))),
        );
        settings
    }
}
