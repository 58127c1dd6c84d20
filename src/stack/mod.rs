//! Declarative resource graph
//!
//! A [`Stack`] collects resource declarations that an external provisioning
//! engine turns into create/update/delete calls. Nothing here talks to the
//! cloud: declaring a resource records its type, properties and position in
//! the dependency graph, and [`Stack::plan`] serializes the result.
//!
//! # Outputs
//!
//! Values only known after provisioning (ids, FQDNs, keys) are modeled as
//! [`Output`] strings of the form `${resource.attribute}`. Any string property
//! may embed them, which is how dependencies are discovered:
//!
//! ```text
//! cosmos-aci ──▶ aci-db ──▶ aci-items
//!      │                        │
//!      └──────────┬─────────────┘
//!                 ▼
//!           aci-grp-westus
//! ```
//!
//! # Example
//!
//! ```
//! use geoshort::stack::{ResourceOptions, Stack};
//! use geoshort::stack::resources::ResourceGroupArgs;
//!
//! let mut stack = Stack::new("geoshort", "dev");
//! let rg = stack
//!     .declare("UrlShortener", &ResourceGroupArgs::new("westus"), ResourceOptions::default())
//!     .unwrap();
//! assert_eq!(rg.output("name").as_str(), "${UrlShortener.name}");
//! ```

pub mod error;
pub mod naming;
pub mod resources;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

pub use error::{StackError, StackResult};

lazy_static! {
    /// Matches `${resource.attr}` and `${config:key}` references
    static ref REFERENCE_RE: Regex = Regex::new(
        r"\$\{(?:config:(?P<config>[A-Za-z0-9_]+)|(?P<resource>[A-Za-z0-9_\-]+)\.(?P<attr>[A-Za-z][A-Za-z0-9_]*))\}"
    )
    .expect("reference pattern is valid");

    static ref NAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_\-]+$").expect("name pattern is valid");
}

// ============================================================================
// Outputs and secrets
// ============================================================================

/// A string that may embed references to values resolved at provisioning time
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Output(String);

impl Output {
    /// A value known at declaration time
    pub fn literal(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Reference to an attribute of a declared resource
    pub(crate) fn reference(resource: &str, attribute: &str) -> Self {
        Self(format!("${{{resource}.{attribute}}}"))
    }

    /// Reference to a secret held in the provisioning engine's stack config
    pub fn config_secret(key: &str) -> Self {
        Self(format!("${{config:{key}}}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Names of resources this output depends on
    pub fn resource_references(&self) -> BTreeSet<String> {
        let mut refs = BTreeSet::new();
        collect_resource_refs(&self.0, &mut refs);
        refs
    }

    /// Stack config keys this output pulls in
    pub fn config_references(&self) -> BTreeSet<String> {
        REFERENCE_RE
            .captures_iter(&self.0)
            .filter_map(|c| c.name("config").map(|m| m.as_str().to_string()))
            .collect()
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Output {
    fn from(value: &str) -> Self {
        Self::literal(value)
    }
}

impl From<String> for Output {
    fn from(value: String) -> Self {
        Self::literal(value)
    }
}

/// A value that must be stored encrypted by the provisioning engine.
///
/// Serializes as `{"secret": <value>}`; `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Secret<T>(T);

impl<T> Secret<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([redacted])")
    }
}

impl<T: Serialize> Serialize for Secret<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wrapped<'a, T> {
            secret: &'a T,
        }
        Wrapped { secret: &self.0 }.serialize(serializer)
    }
}

/// Setting value that is either plain or secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SettingValue {
    Plain(Output),
    Secret(Secret<Output>),
}

impl From<Output> for SettingValue {
    fn from(value: Output) -> Self {
        Self::Plain(value)
    }
}

impl From<Secret<Output>> for SettingValue {
    fn from(value: Secret<Output>) -> Self {
        Self::Secret(value)
    }
}

// ============================================================================
// Resources
// ============================================================================

/// Typed arguments of one provider resource type
pub trait ResourceArgs: Serialize {
    /// Provider type token, e.g. `azure:cosmosdb/account:Account`
    const TYPE: &'static str;
}

/// Handle to a declared resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    name: String,
    type_token: &'static str,
}

impl ResourceRef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_token(&self) -> &'static str {
        self.type_token
    }

    /// Reference to one attribute of this resource
    pub fn output(&self, attribute: &str) -> Output {
        Output::reference(&self.name, attribute)
    }

    /// Provider resource id
    pub fn id(&self) -> Output {
        self.output("id")
    }
}

/// Per-declaration options understood by the provisioning engine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceOptions {
    pub parent: Option<String>,
    pub depends_on: Vec<String>,
    pub delete_before_replace: bool,
}

impl ResourceOptions {
    pub fn parent(mut self, parent: &ResourceRef) -> Self {
        self.parent = Some(parent.name.clone());
        self
    }

    pub fn depends_on(mut self, resource: &ResourceRef) -> Self {
        self.depends_on.push(resource.name.clone());
        self
    }

    pub fn delete_before_replace(mut self) -> Self {
        self.delete_before_replace = true;
        self
    }
}

/// One declared resource
#[derive(Debug, Clone)]
pub struct Resource {
    pub name: String,
    pub type_token: &'static str,
    pub properties: Value,
    pub options: ResourceOptions,
    /// Resources that must exist before this one
    pub dependencies: BTreeSet<String>,
}

impl Resource {
    /// Property lookup by JSON pointer, e.g. `/consistencyPolicy/consistencyLevel`
    pub fn property(&self, pointer: &str) -> Option<&Value> {
        self.properties.pointer(pointer)
    }
}

// ============================================================================
// Stack
// ============================================================================

/// An ordered collection of resource declarations plus exported outputs
#[derive(Debug, Clone)]
pub struct Stack {
    project: String,
    stack: String,
    resources: Vec<Resource>,
    index: HashMap<String, usize>,
    outputs: BTreeMap<String, Output>,
}

impl Stack {
    pub fn new(project: impl Into<String>, stack: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            stack: stack.into(),
            resources: Vec::new(),
            index: HashMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    /// Declare a provider resource
    pub fn declare<A: ResourceArgs>(
        &mut self,
        name: impl Into<String>,
        args: &A,
        options: ResourceOptions,
    ) -> StackResult<ResourceRef> {
        let name = name.into();
        let properties = serde_json::to_value(args).map_err(|source| StackError::Serialize {
            name: name.clone(),
            source,
        })?;
        self.insert(name, A::TYPE, properties, options)
    }

    /// Declare a component resource that only groups children
    pub fn declare_component(
        &mut self,
        type_token: &'static str,
        name: impl Into<String>,
        options: ResourceOptions,
    ) -> StackResult<ResourceRef> {
        self.insert(name.into(), type_token, Value::Object(Default::default()), options)
    }

    fn insert(
        &mut self,
        name: String,
        type_token: &'static str,
        properties: Value,
        options: ResourceOptions,
    ) -> StackResult<ResourceRef> {
        if !NAME_RE.is_match(&name) {
            return Err(StackError::InvalidName {
                reason: "names must be non-empty and use [A-Za-z0-9_-]".to_string(),
                name,
            });
        }

        if let Some(&existing) = self.index.get(&name) {
            return Err(StackError::DuplicateResource {
                existing_type: self.resources[existing].type_token.to_string(),
                name,
            });
        }

        let mut dependencies = BTreeSet::new();
        collect_value_refs(&properties, &mut dependencies);
        dependencies.extend(options.depends_on.iter().cloned());
        dependencies.extend(options.parent.iter().cloned());

        if let Some(unknown) = dependencies.iter().find(|d| !self.index.contains_key(*d)) {
            return Err(StackError::UnknownReference {
                resource: name,
                reference: unknown.clone(),
            });
        }

        tracing::debug!(
            resource = %name,
            type_token = type_token,
            dependencies = dependencies.len(),
            "Declared resource"
        );

        self.index.insert(name.clone(), self.resources.len());
        self.resources.push(Resource {
            name: name.clone(),
            type_token,
            properties,
            options,
            dependencies,
        });

        Ok(ResourceRef { name, type_token })
    }

    /// Record a stack output
    pub fn export(&mut self, name: impl Into<String>, value: Output) {
        self.outputs.insert(name.into(), value);
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn stack_name(&self) -> &str {
        &self.stack
    }

    /// All declarations, in declaration order
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn get(&self, name: &str) -> Option<&Resource> {
        self.index.get(name).map(|&i| &self.resources[i])
    }

    pub fn resources_of_type<'a>(
        &'a self,
        type_token: &'a str,
    ) -> impl Iterator<Item = &'a Resource> + 'a {
        self.resources
            .iter()
            .filter(move |r| r.type_token == type_token)
    }

    /// Direct children of a resource
    pub fn children<'a>(&'a self, parent: &'a str) -> impl Iterator<Item = &'a Resource> + 'a {
        self.resources
            .iter()
            .filter(move |r| r.options.parent.as_deref() == Some(parent))
    }

    pub fn outputs(&self) -> &BTreeMap<String, Output> {
        &self.outputs
    }

    /// Stack config keys referenced anywhere in the declarations
    pub fn required_config(&self) -> BTreeSet<String> {
        let mut keys = BTreeSet::new();
        for resource in &self.resources {
            collect_value_config(&resource.properties, &mut keys);
        }
        keys
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Serializable view handed to the provisioning engine
    pub fn plan(&self) -> Plan {
        Plan {
            project: self.project.clone(),
            stack: self.stack.clone(),
            required_config: self.required_config().into_iter().collect(),
            resources: self
                .resources
                .iter()
                .map(|r| PlannedResource {
                    urn: format!("urn:geoshort:{}::{}::{}::{}", self.stack, self.project, r.type_token, r.name),
                    type_token: r.type_token.to_string(),
                    name: r.name.clone(),
                    parent: r.options.parent.clone(),
                    dependencies: r.dependencies.iter().cloned().collect(),
                    delete_before_replace: r.options.delete_before_replace,
                    properties: r.properties.clone(),
                })
                .collect(),
            outputs: self.outputs.clone(),
        }
    }
}

// ============================================================================
// Plan
// ============================================================================

/// Serialized stack: declarations in dependency-respecting order plus outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub project: String,
    pub stack: String,
    pub required_config: Vec<String>,
    pub resources: Vec<PlannedResource>,
    pub outputs: BTreeMap<String, Output>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedResource {
    pub urn: String,
    #[serde(rename = "type")]
    pub type_token: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub dependencies: Vec<String>,
    pub delete_before_replace: bool,
    pub properties: Value,
}

impl Plan {
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

// ============================================================================
// Reference scanning
// ============================================================================

fn collect_resource_refs(text: &str, out: &mut BTreeSet<String>) {
    for captures in REFERENCE_RE.captures_iter(text) {
        if let Some(resource) = captures.name("resource") {
            out.insert(resource.as_str().to_string());
        }
    }
}

fn collect_value_refs(value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::String(s) => collect_resource_refs(s, out),
        Value::Array(items) => items.iter().for_each(|v| collect_value_refs(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_value_refs(v, out)),
        _ => {}
    }
}

fn collect_value_config(value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::String(s) => out.extend(Output::literal(s.as_str()).config_references()),
        Value::Array(items) => items.iter().for_each(|v| collect_value_config(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_value_config(v, out)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::resources::{ResourceGroupArgs, SqlDatabaseArgs};
    use super::*;

    fn stack_with_group() -> (Stack, ResourceRef) {
        let mut stack = Stack::new("geoshort", "test");
        let rg = stack
            .declare("rg", &ResourceGroupArgs::new("westus"), ResourceOptions::default())
            .unwrap();
        (stack, rg)
    }

    #[test]
    fn test_output_reference_format() {
        let out = Output::reference("cosmos-aci", "endpoint");
        assert_eq!(out.as_str(), "${cosmos-aci.endpoint}");
        assert!(out.resource_references().contains("cosmos-aci"));
    }

    #[test]
    fn test_interpolated_output_keeps_references() {
        let out = Output::from(format!("http://{}/x", Output::reference("tm", "fqdn")));
        assert_eq!(out.as_str(), "http://${tm.fqdn}/x");
        assert_eq!(out.resource_references().len(), 1);
    }

    #[test]
    fn test_config_secret_reference() {
        let out = Output::config_secret("vmAdminPassword");
        assert!(out.resource_references().is_empty());
        assert!(out.config_references().contains("vmAdminPassword"));
    }

    #[test]
    fn test_secret_serialization_and_debug() {
        let secret = Secret::new(Output::literal("hunter2"));
        let json = serde_json::to_value(&secret).unwrap();
        assert_eq!(json, serde_json::json!({ "secret": "hunter2" }));
        assert!(!format!("{secret:?}").contains("hunter2"));
    }

    #[test]
    fn test_duplicate_rejected() {
        let (mut stack, _) = stack_with_group();
        let err = stack
            .declare("rg", &ResourceGroupArgs::new("eastus"), ResourceOptions::default())
            .unwrap_err();
        assert!(matches!(err, StackError::DuplicateResource { .. }));
    }

    #[test]
    fn test_invalid_name_rejected() {
        let mut stack = Stack::new("geoshort", "test");
        let err = stack
            .declare("bad name", &ResourceGroupArgs::new("westus"), ResourceOptions::default())
            .unwrap_err();
        assert!(matches!(err, StackError::InvalidName { .. }));
    }

    #[test]
    fn test_dependencies_collected_from_properties() {
        let (mut stack, rg) = stack_with_group();
        let args = SqlDatabaseArgs {
            resource_group_name: rg.output("name"),
            account_name: Output::literal("static-account"),
        };
        stack.declare("db", &args, ResourceOptions::default()).unwrap();

        let db = stack.get("db").unwrap();
        assert!(db.dependencies.contains("rg"));
        assert_eq!(db.dependencies.len(), 1);
    }

    #[test]
    fn test_unknown_reference_rejected() {
        let (mut stack, rg) = stack_with_group();
        let args = SqlDatabaseArgs {
            resource_group_name: rg.output("name"),
            account_name: Output::reference("missing-account", "name"),
        };
        let err = stack.declare("db", &args, ResourceOptions::default()).unwrap_err();
        match err {
            StackError::UnknownReference { resource, reference } => {
                assert_eq!(resource, "db");
                assert_eq!(reference, "missing-account");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(stack.get("db").is_none());
    }

    #[test]
    fn test_parent_counts_as_dependency() {
        let (mut stack, rg) = stack_with_group();
        let component = stack
            .declare_component("geoshort:test:Component", "comp", ResourceOptions::default().parent(&rg))
            .unwrap();
        assert_eq!(component.type_token(), "geoshort:test:Component");
        assert!(stack.get("comp").unwrap().dependencies.contains("rg"));
        assert_eq!(stack.children("rg").count(), 1);
    }

    #[test]
    fn test_plan_preserves_order_and_outputs() {
        let (mut stack, rg) = stack_with_group();
        stack.export("groupName", rg.output("name"));

        let plan = stack.plan();
        assert_eq!(plan.resources.len(), 1);
        assert_eq!(plan.resources[0].type_token, "azure:core/resourceGroup:ResourceGroup");
        assert_eq!(plan.outputs["groupName"].as_str(), "${rg.name}");

        let json = plan.to_json_pretty().unwrap();
        assert!(json.contains("\"type\": \"azure:core/resourceGroup:ResourceGroup\""));
    }
}
