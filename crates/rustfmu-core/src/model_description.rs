//! `modelDescription.xml` generation.
//!
//! The [`ModelDescriptionBuilder`] walks a [`VariableRegistry`] together with the
//! [`ModelMetadata`] of a slave and writes the FMI 2.0 Co-Simulation model description.
//! Apart from the GUID and the generation timestamp (both injectable) the output is fully
//! determined by its inputs, attribute order included.
//!
//! Building the description resolves missing start values from the live slave (see
//! [`VariableRegistry::resolve_start_values`]), so the registry is borrowed mutably.
//!
//! # Example
//!
//! ```rust
//! use rustfmu_core::binding::BindingSpec;
//! use rustfmu_core::model_description::{ModelDescriptionBuilder, ModelMetadata};
//! use rustfmu_core::registry::VariableRegistry;
//! use rustfmu_core::variable::{Causality, ScalarVariable};
//! use rustfmu_core::Reflect;
//!
//! #[derive(Reflect)]
//! struct Gain {
//!     k: f64,
//!     y: f64,
//! }
//!
//! let slave = Gain { k: 2.0, y: 0.0 };
//! let mut registry = VariableRegistry::new();
//! let k = ScalarVariable::real("k").with_causality(Causality::Parameter);
//! let y = ScalarVariable::real("y").with_causality(Causality::Output);
//! registry.register_with(&slave, k, BindingSpec::Auto).unwrap();
//! registry.register_with(&slave, y, BindingSpec::Auto).unwrap();
//!
//! let metadata = ModelMetadata::new("Gain");
//! let xml = ModelDescriptionBuilder::new(&metadata)
//!     .with_capability("canHandleVariableCommunicationStepSize", false)
//!     .build(&mut registry, &slave)
//!     .unwrap();
//!
//! assert!(xml.contains(r#"<Real start="2.0"/>"#));
//! assert!(xml.contains(r#"<Unknown index="2"/>"#));
//! ```

use crate::errors::{FmuError, FmuResult};
use crate::logging::{default_log_categories, LogCategories};
use crate::reflect::Reflect;
use crate::registry::VariableRegistry;
use crate::value::ScalarValue;
use crate::variable::{Causality, ScalarVariable};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use serde::{Deserialize, Serialize};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{LazyLock, RwLock};
use tracing::debug;
use uuid::Uuid;

pub const FMI_VERSION: &str = "2.0";

/// Value of the `generationTool` attribute.
pub const GENERATION_TOOL: &str = concat!("rustfmu ", env!("CARGO_PKG_VERSION"));

/// Co-Simulation capability flags in document order, with their defaults.
pub const CAPABILITIES: [(&str, bool); 7] = [
    ("needsExecutionTool", false),
    ("canHandleVariableCommunicationStepSize", true),
    ("canInterpolateInputs", false),
    ("canBeInstantiatedOnlyOncePerProcess", false),
    ("canGetAndSetFMUstate", true),
    ("canSerializeFMUstate", true),
    ("canNotUseMemoryManagementFunctions", true),
];

/// Capability flag name -> value. Names outside [`CAPABILITIES`] are ignored.
pub type CapabilityOverrides = IndexMap<String, bool>;

/// Resolve the capability table, applying each layer of overrides in turn.
pub fn capability_flags(layers: &[&CapabilityOverrides]) -> Vec<(&'static str, bool)> {
    for layer in layers {
        for name in layer.keys() {
            if !CAPABILITIES.iter().any(|(known, _)| *known == name.as_str()) {
                debug!(capability = %name, "Ignoring unknown capability flag");
            }
        }
    }

    CAPABILITIES
        .iter()
        .map(|(name, default)| {
            let value = layers
                .iter()
                .rev()
                .find_map(|layer| layer.get(*name).copied())
                .unwrap_or(*default);
            (*name, value)
        })
        .collect()
}

/// Suggested experiment settings. Each field is optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultExperiment {
    pub start_time: Option<f64>,
    pub stop_time: Option<f64>,
    pub tolerance: Option<f64>,
    pub step_size: Option<f64>,
}

impl DefaultExperiment {
    fn attributes(&self) -> Vec<(&'static str, f64)> {
        [
            ("startTime", self.start_time),
            ("stopTime", self.stop_time),
            ("stepSize", self.step_size),
            ("tolerance", self.tolerance),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect()
    }
}

/// Model-level metadata shared by every instance of a slave type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_name: String,
    /// Explicit GUID. When absent, a name-based GUID is derived from the model.
    #[serde(default)]
    pub guid: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub copyright: Option<String>,
    #[serde(default)]
    pub default_experiment: Option<DefaultExperiment>,
    #[serde(default = "default_log_categories")]
    pub log_categories: LogCategories,
    /// Per-model capability defaults, applied before build-time overrides.
    #[serde(default)]
    pub capabilities: CapabilityOverrides,
}

impl ModelMetadata {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            guid: None,
            description: None,
            author: None,
            license: None,
            version: None,
            copyright: None,
            default_experiment: None,
            log_categories: default_log_categories(),
            capabilities: CapabilityOverrides::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_license(mut self, license: impl Into<String>) -> Self {
        self.license = Some(license.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_copyright(mut self, copyright: impl Into<String>) -> Self {
        self.copyright = Some(copyright.into());
        self
    }

    pub fn with_guid(mut self, guid: impl Into<String>) -> Self {
        self.guid = Some(guid.into());
        self
    }

    pub fn with_default_experiment(mut self, experiment: DefaultExperiment) -> Self {
        self.default_experiment = Some(experiment);
        self
    }

    pub fn with_log_categories(mut self, categories: LogCategories) -> Self {
        self.log_categories = categories;
        self
    }

    pub fn with_capability(mut self, name: impl Into<String>, value: bool) -> Self {
        self.capabilities.insert(name.into(), value);
        self
    }

    /// Fail unless a model name is set.
    pub fn validate(&self) -> FmuResult<()> {
        if self.model_name.trim().is_empty() {
            return Err(FmuError::MissingModelName);
        }
        Ok(())
    }
}

/// Derive a name-based GUID from the model name and its ordered variable signature.
///
/// Two builds with the same model name and variables produce the same GUID.
pub fn derive_guid<'a>(
    model_name: &str,
    variables: impl IntoIterator<Item = &'a ScalarVariable>,
) -> String {
    let mut signature = model_name.to_string();
    for variable in variables {
        signature.push('\n');
        signature.push_str(&format!(
            "{}:{}:{}:{}",
            variable.name(),
            variable.variable_type(),
            variable.causality().map(|c| c.name()).unwrap_or_default(),
            variable.variability().map(|v| v.name()).unwrap_or_default(),
        ));
    }
    Uuid::new_v5(&Uuid::NAMESPACE_OID, signature.as_bytes()).to_string()
}

/// GUIDs computed per slave type.
static GUID_CACHE: LazyLock<RwLock<HashMap<TypeId, String>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// GUID of slave type `S`, computed by `compute` on first use and cached for the process.
pub fn cached_guid<S: 'static>(compute: impl FnOnce() -> String) -> String {
    let key = TypeId::of::<S>();
    {
        let cache = GUID_CACHE
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(guid) = cache.get(&key) {
            return guid.clone();
        }
    }

    let mut cache = GUID_CACHE
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    // Another instance may have won the race between the two locks.
    cache.entry(key).or_insert_with(compute).clone()
}

/// Writes `modelDescription.xml`.
#[derive(Debug, Clone)]
pub struct ModelDescriptionBuilder<'a> {
    metadata: &'a ModelMetadata,
    guid: Option<String>,
    capabilities: CapabilityOverrides,
    timestamp: Option<DateTime<Utc>>,
}

impl<'a> ModelDescriptionBuilder<'a> {
    pub fn new(metadata: &'a ModelMetadata) -> Self {
        Self {
            metadata,
            guid: None,
            capabilities: CapabilityOverrides::new(),
            timestamp: None,
        }
    }

    /// Use `guid` instead of the metadata GUID or a derived one.
    pub fn with_guid(mut self, guid: impl Into<String>) -> Self {
        self.guid = Some(guid.into());
        self
    }

    /// Override a capability flag for this build.
    pub fn with_capability(mut self, name: impl Into<String>, value: bool) -> Self {
        self.capabilities.insert(name.into(), value);
        self
    }

    pub fn with_capabilities(mut self, overrides: &CapabilityOverrides) -> Self {
        self.capabilities
            .extend(overrides.iter().map(|(k, v)| (k.clone(), *v)));
        self
    }

    /// Fix the generation timestamp. Defaults to the current time.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Render the model description for `registry`, resolving missing start values from
    /// `slave` first.
    pub fn build<S: Reflect>(
        &self,
        registry: &mut VariableRegistry<S>,
        slave: &S,
    ) -> FmuResult<String> {
        self.metadata.validate()?;
        registry.resolve_start_values(slave)?;
        self.render(registry)
    }

    fn render<S>(&self, registry: &VariableRegistry<S>) -> FmuResult<String> {
        let metadata = self.metadata;
        let guid = self
            .guid
            .clone()
            .or_else(|| metadata.guid.clone())
            .unwrap_or_else(|| derive_guid(&metadata.model_name, registry.variables()));
        let timestamp = self
            .timestamp
            .unwrap_or_else(Utc::now)
            .format("%Y-%m-%dT%H:%M:%SZ")
            .to_string();

        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut root = BytesStart::new("fmiModelDescription");
        root.push_attribute(("fmiVersion", FMI_VERSION));
        root.push_attribute(("modelName", metadata.model_name.as_str()));
        root.push_attribute(("guid", guid.as_str()));
        root.push_attribute(("generationTool", GENERATION_TOOL));
        root.push_attribute(("generationDateAndTime", timestamp.as_str()));
        root.push_attribute(("variableNamingConvention", "structured"));
        for (name, value) in [
            ("description", &metadata.description),
            ("author", &metadata.author),
            ("license", &metadata.license),
            ("version", &metadata.version),
            ("copyright", &metadata.copyright),
        ] {
            if let Some(value) = value {
                root.push_attribute((name, value.as_str()));
            }
        }
        writer.write_event(Event::Start(root))?;

        let mut co_simulation = BytesStart::new("CoSimulation");
        co_simulation.push_attribute(("modelIdentifier", metadata.model_name.as_str()));
        for (name, value) in capability_flags(&[&metadata.capabilities, &self.capabilities]) {
            co_simulation.push_attribute((name, if value { "true" } else { "false" }));
        }
        writer.write_event(Event::Empty(co_simulation))?;

        if !metadata.log_categories.is_empty() {
            writer.write_event(Event::Start(BytesStart::new("LogCategories")))?;
            for (name, description) in &metadata.log_categories {
                let mut category = BytesStart::new("Category");
                category.push_attribute(("name", name.as_str()));
                category.push_attribute(("description", description.as_str()));
                writer.write_event(Event::Empty(category))?;
            }
            writer.write_event(Event::End(BytesEnd::new("LogCategories")))?;
        }

        if let Some(experiment) = &metadata.default_experiment {
            let mut element = BytesStart::new("DefaultExperiment");
            for (name, value) in experiment.attributes() {
                element.push_attribute((name, ScalarValue::Real(value).render().as_str()));
            }
            writer.write_event(Event::Empty(element))?;
        }

        writer.write_event(Event::Start(BytesStart::new("ModelVariables")))?;
        for variable in registry.variables() {
            write_scalar_variable(&mut writer, variable)?;
        }
        writer.write_event(Event::End(BytesEnd::new("ModelVariables")))?;

        let outputs: Vec<usize> = registry
            .variables()
            .enumerate()
            .filter(|(_, v)| v.causality() == Some(Causality::Output))
            .map(|(position, _)| position + 1)
            .collect();
        if outputs.is_empty() {
            writer.write_event(Event::Empty(BytesStart::new("ModelStructure")))?;
        } else {
            writer.write_event(Event::Start(BytesStart::new("ModelStructure")))?;
            writer.write_event(Event::Start(BytesStart::new("Outputs")))?;
            for index in outputs {
                let mut unknown = BytesStart::new("Unknown");
                unknown.push_attribute(("index", index.to_string().as_str()));
                writer.write_event(Event::Empty(unknown))?;
            }
            writer.write_event(Event::End(BytesEnd::new("Outputs")))?;
            writer.write_event(Event::End(BytesEnd::new("ModelStructure")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("fmiModelDescription")))?;

        String::from_utf8(writer.into_inner()).map_err(|e| FmuError::Xml(e.to_string()))
    }
}

fn write_scalar_variable(
    writer: &mut Writer<Vec<u8>>,
    variable: &ScalarVariable,
) -> FmuResult<()> {
    let value_reference = variable
        .value_reference()
        .ok_or_else(|| {
            FmuError::Error(format!(
                "Variable '{}' has no value reference",
                variable.name()
            ))
        })?
        .to_string();

    let mut element = BytesStart::new("ScalarVariable");
    element.push_attribute(("name", variable.name()));
    element.push_attribute(("valueReference", value_reference.as_str()));
    if let Some(description) = variable.description() {
        element.push_attribute(("description", description));
    }
    if let Some(causality) = variable.causality() {
        element.push_attribute(("causality", causality.name()));
    }
    if let Some(variability) = variable.variability() {
        element.push_attribute(("variability", variability.name()));
    }
    if let Some(initial) = variable.initial() {
        element.push_attribute(("initial", initial.name()));
    }
    writer.write_event(Event::Start(element))?;

    let mut type_element = BytesStart::new(variable.variable_type().element_name());
    if let Some(start) = variable.start() {
        type_element.push_attribute(("start", start.render().as_str()));
    }
    writer.write_event(Event::Empty(type_element))?;

    writer.write_event(Event::End(BytesEnd::new("ScalarVariable")))?;
    Ok(())
}
