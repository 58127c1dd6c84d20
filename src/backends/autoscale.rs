//! CPU-driven autoscale policy for scale sets

use crate::stack::resources::{
    AutoscaleCapacity, AutoscaleProfile, ComparisonOperator, MetricTrigger, ScaleAction,
    ScaleDirection, ScaleRule,
};
use crate::stack::Output;

pub const CPU_METRIC: &str = "Percentage CPU";
pub const SCALE_UP_CPU_PERCENT: f64 = 75.0;
pub const SCALE_DOWN_CPU_PERCENT: f64 = 25.0;
pub const TIME_GRAIN: &str = "PT1M";
pub const TIME_WINDOW: &str = "PT5M";
pub const COOLDOWN: &str = "PT1M";
pub const MIN_INSTANCES: u32 = 1;
pub const MAX_INSTANCES: u32 = 10;
pub const DEFAULT_INSTANCES: u32 = 1;

/// Default profile: +1 above 75% average CPU, -1 below 25%, 1..=10 instances
pub fn cpu_profile(scale_set_id: &Output) -> AutoscaleProfile {
    AutoscaleProfile {
        name: "defaultProfile".to_string(),
        capacity: AutoscaleCapacity {
            default: DEFAULT_INSTANCES,
            minimum: MIN_INSTANCES,
            maximum: MAX_INSTANCES,
        },
        rules: vec![
            cpu_rule(
                scale_set_id,
                ComparisonOperator::GreaterThan,
                SCALE_UP_CPU_PERCENT,
                ScaleDirection::Increase,
            ),
            cpu_rule(
                scale_set_id,
                ComparisonOperator::LessThan,
                SCALE_DOWN_CPU_PERCENT,
                ScaleDirection::Decrease,
            ),
        ],
    }
}

fn cpu_rule(
    scale_set_id: &Output,
    operator: ComparisonOperator,
    threshold: f64,
    direction: ScaleDirection,
) -> ScaleRule {
    ScaleRule {
        metric_trigger: MetricTrigger {
            metric_name: CPU_METRIC.to_string(),
            metric_resource_id: scale_set_id.clone(),
            operator,
            statistic: "Average".to_string(),
            threshold,
            time_aggregation: "Average".to_string(),
            time_grain: TIME_GRAIN.to_string(),
            time_window: TIME_WINDOW.to_string(),
        },
        scale_action: ScaleAction {
            direction,
            action_type: "ChangeCount".to_string(),
            value: 1,
            cooldown: COOLDOWN.to_string(),
        },
    }
}
