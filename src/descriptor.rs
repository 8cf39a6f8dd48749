//! Action descriptors
//!
//! An [`ActionDescriptor`] is the immutable description of one pipeline step
//! handed to the cache before the step runs. Descriptors are assembled with
//! [`ActionDescriptorBuilder`] or from an upstream [`ProvenanceDescriptor`].

use crate::error::{ProvcacheError, ProvcacheResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Reference to an artifact consumed by an action
///
/// Either the name/identifier of the action that produced it, or an opaque
/// reference (path, UUID, digest) for externally supplied data.
pub type ArtifactRef = String;

/// Kind of pipeline action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    /// Brings external data into the pipeline
    Import,
    /// Computes new artifacts from existing ones
    Transform,
    /// Renders artifacts for inspection
    Visualize,
    /// Composite action running other actions
    Pipeline,
}

impl ActionType {
    /// Canonical lowercase name, as stored and fingerprinted
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Transform => "transform",
            Self::Visualize => "visualize",
            Self::Pipeline => "pipeline",
        }
    }

    /// Whether this action originates data rather than deriving it
    pub fn is_import(&self) -> bool {
        matches!(self, Self::Import)
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = ProvcacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "import" => Ok(Self::Import),
            "transform" | "method" => Ok(Self::Transform),
            "visualize" | "visualizer" => Ok(Self::Visualize),
            "pipeline" => Ok(Self::Pipeline),
            other => Err(ProvcacheError::InvalidDescriptor(format!(
                "unknown action type '{other}'"
            ))),
        }
    }
}

/// Provenance fields supplied by the upstream descriptor parser
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceDescriptor {
    /// Action type as written upstream (`import`, `method`, ...)
    pub action_type: String,

    /// Input parameter name to artifact reference
    #[serde(default)]
    pub inputs: BTreeMap<String, ArtifactRef>,

    /// Parameter name to value
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
}

/// Immutable description of one action execution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionDescriptor {
    name: String,
    action: String,
    action_type: ActionType,
    inputs: BTreeMap<String, ArtifactRef>,
    parameters: BTreeMap<String, serde_json::Value>,
    description: String,
    working_dir: PathBuf,
}

impl ActionDescriptor {
    /// Start building a descriptor
    pub fn builder(name: impl Into<String>, action_type: ActionType) -> ActionDescriptorBuilder {
        ActionDescriptorBuilder::new(name.into(), action_type)
    }

    /// Assemble a descriptor from upstream provenance plus invocation details
    pub fn from_provenance(
        name: impl Into<String>,
        action: impl Into<String>,
        description: impl Into<String>,
        provenance: &ProvenanceDescriptor,
        working_dir: impl Into<PathBuf>,
    ) -> ProvcacheResult<Self> {
        let action_type: ActionType = provenance.action_type.parse()?;
        let mut builder = Self::builder(name, action_type)
            .action(action)
            .description(description)
            .working_dir(working_dir);
        for (param, reference) in &provenance.inputs {
            builder = builder.input(param.clone(), reference.clone());
        }
        for (param, value) in &provenance.parameters {
            builder = builder.parameter_value(param.clone(), value.clone());
        }
        builder.build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn action_type(&self) -> ActionType {
        self.action_type
    }

    pub fn inputs(&self) -> &BTreeMap<String, ArtifactRef> {
        &self.inputs
    }

    pub fn parameters(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.parameters
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn working_dir(&self) -> &std::path::Path {
        &self.working_dir
    }
}

/// Builder for [`ActionDescriptor`]
///
/// Encoding failures of typed parameters are deferred to [`build`](Self::build)
/// so the builder can be chained.
#[derive(Debug)]
pub struct ActionDescriptorBuilder {
    name: String,
    action: Option<String>,
    action_type: ActionType,
    inputs: BTreeMap<String, ArtifactRef>,
    parameters: BTreeMap<String, serde_json::Value>,
    description: String,
    working_dir: Option<PathBuf>,
    error: Option<ProvcacheError>,
}

impl ActionDescriptorBuilder {
    fn new(name: String, action_type: ActionType) -> Self {
        Self {
            name,
            action: None,
            action_type,
            inputs: BTreeMap::new(),
            parameters: BTreeMap::new(),
            description: String::new(),
            working_dir: None,
            error: None,
        }
    }

    /// Callable that performs the action (defaults to the action name)
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Working directory recorded as provenance (defaults to the current directory)
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn input(mut self, param: impl Into<String>, reference: impl Into<ArtifactRef>) -> Self {
        self.inputs.insert(param.into(), reference.into());
        self
    }

    pub fn parameter_value(mut self, param: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(param.into(), value);
        self
    }

    /// Add a parameter from any serializable value
    pub fn parameter<T: Serialize + ?Sized>(mut self, param: impl Into<String>, value: &T) -> Self {
        let param = param.into();
        match serde_json::to_value(value) {
            Ok(value) => {
                self.parameters.insert(param, value);
            }
            Err(e) => {
                if self.error.is_none() {
                    self.error = Some(ProvcacheError::encoding(
                        format!("parameters.{param}"),
                        e.to_string(),
                    ));
                }
            }
        }
        self
    }

    /// Finish the descriptor
    pub fn build(self) -> ProvcacheResult<ActionDescriptor> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.name.trim().is_empty() {
            return Err(ProvcacheError::InvalidDescriptor(
                "action name must not be empty".to_string(),
            ));
        }

        let working_dir = match self.working_dir {
            Some(dir) => dir,
            None => std::env::current_dir()
                .map_err(|e| ProvcacheError::io("getting current directory", e))?,
        };

        Ok(ActionDescriptor {
            action: self.action.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            action_type: self.action_type,
            inputs: self.inputs,
            parameters: self.parameters,
            description: self.description,
            working_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn action_type_parses_upstream_aliases() {
        assert_eq!("import".parse::<ActionType>().unwrap(), ActionType::Import);
        assert_eq!("method".parse::<ActionType>().unwrap(), ActionType::Transform);
        assert_eq!(
            "Visualizer".parse::<ActionType>().unwrap(),
            ActionType::Visualize
        );
        assert!("compile".parse::<ActionType>().is_err());
    }

    #[test]
    fn action_type_display() {
        assert_eq!(ActionType::Transform.to_string(), "transform");
        assert!(ActionType::Import.is_import());
        assert!(!ActionType::Pipeline.is_import());
    }

    #[test]
    fn builder_defaults_action_to_name() {
        let descriptor = ActionDescriptor::builder("a1", ActionType::Import)
            .working_dir("/work")
            .build()
            .unwrap();
        assert_eq!(descriptor.action(), "a1");
        assert_eq!(descriptor.working_dir(), std::path::Path::new("/work"));
        assert!(descriptor.inputs().is_empty());
    }

    #[test]
    fn builder_rejects_empty_name() {
        let err = ActionDescriptor::builder("  ", ActionType::Transform)
            .working_dir("/work")
            .build()
            .unwrap_err();
        assert!(matches!(err, ProvcacheError::InvalidDescriptor(_)));
    }

    #[test]
    fn builder_surfaces_unencodable_parameter() {
        let mut weird = HashMap::new();
        weird.insert((1, 2), "tuple keys are not JSON object keys");

        let err = ActionDescriptor::builder("a2", ActionType::Transform)
            .working_dir("/work")
            .parameter("weird", &weird)
            .build()
            .unwrap_err();
        match err {
            ProvcacheError::Encoding { field, .. } => assert_eq!(field, "parameters.weird"),
            other => panic!("expected encoding error, got {other:?}"),
        }
    }

    #[test]
    fn from_provenance_copies_fields() {
        let provenance = ProvenanceDescriptor {
            action_type: "method".to_string(),
            inputs: BTreeMap::from([("table".to_string(), "a1".to_string())]),
            parameters: BTreeMap::from([("min_frequency".to_string(), json!(10))]),
        };

        let descriptor = ActionDescriptor::from_provenance(
            "filter",
            "feature_table.filter_samples",
            "drop rare samples",
            &provenance,
            "/project",
        )
        .unwrap();

        assert_eq!(descriptor.action_type(), ActionType::Transform);
        assert_eq!(descriptor.action(), "feature_table.filter_samples");
        assert_eq!(descriptor.inputs()["table"], "a1");
        assert_eq!(descriptor.parameters()["min_frequency"], json!(10));
        assert_eq!(descriptor.description(), "drop rare samples");
    }

    #[test]
    fn provenance_descriptor_deserializes_with_defaults() {
        let provenance: ProvenanceDescriptor =
            serde_json::from_str(r#"{"action_type": "import"}"#).unwrap();
        assert!(provenance.inputs.is_empty());
        assert!(provenance.parameters.is_empty());
    }
}
