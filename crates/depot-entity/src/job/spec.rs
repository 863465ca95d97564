//! Caller-constructed job specifications.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use depot_core::result::AppResult;
use depot_core::types::code;
use depot_core::AppError;

/// A transient description of a job to be submitted.
///
/// The type-specific parameters are a free-form JSON object interpreted only
/// by the handler registered for the job type; the orchestrator treats them
/// opaquely apart from using them for coalescing equivalence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpecification {
    /// The job-type code identifying which handler runs this job.
    pub job_type_code: String,
    /// The nickname of the owning user, if any.
    #[serde(default)]
    pub owner_nickname: Option<String>,
    /// Type-specific parameters. Must be a JSON object.
    #[serde(default = "empty_object")]
    pub parameters: Value,
    /// Codes of previously supplied data entries this job will read.
    #[serde(default)]
    pub supplied_data_codes: Vec<String>,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

impl JobSpecification {
    /// Create a specification with the given type code and parameters.
    pub fn new(job_type_code: impl Into<String>, parameters: Value) -> Self {
        Self {
            job_type_code: job_type_code.into(),
            owner_nickname: None,
            parameters,
            supplied_data_codes: Vec::new(),
        }
    }

    /// Set the owning user nickname.
    pub fn with_owner(mut self, owner_nickname: impl Into<String>) -> Self {
        self.owner_nickname = Some(owner_nickname.into());
        self
    }

    /// Reference a supplied data entry by its code.
    pub fn with_supplied_data(mut self, data_code: impl Into<String>) -> Self {
        self.supplied_data_codes.push(data_code.into());
        self
    }

    /// Validate the specification before any durable state is touched.
    ///
    /// The serialized parameter text must be a JSON object (begin with `{`
    /// and end with `}`), the job-type code must be present and well formed,
    /// and the owner nickname must match the external user-identity format.
    pub fn validate(&self) -> AppResult<()> {
        if !code::is_valid_job_type_code(&self.job_type_code) {
            return Err(AppError::validation(format!(
                "malformed job type code [{}]",
                self.job_type_code
            )));
        }

        if !self.parameters.is_object() {
            return Err(AppError::validation(
                "job specification parameters must be a JSON object",
            ));
        }

        if let Some(owner) = &self.owner_nickname {
            code::ensure_owner_nickname(owner)?;
        }

        for data_code in &self.supplied_data_codes {
            code::ensure_code("supplied data code", data_code)?;
        }

        Ok(())
    }

    /// Whether two specifications describe the same work.
    ///
    /// Identity is the job type, the owning user, and the caller-significant
    /// parameters; JSON object comparison is key-order insensitive.
    pub fn is_equivalent(&self, other: &JobSpecification) -> bool {
        self.job_type_code == other.job_type_code
            && self.owner_nickname == other.owner_nickname
            && self.parameters == other.parameters
    }
}
