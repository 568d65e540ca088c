use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// ========================================
/// Caller-facing request/result types
/// ========================================

/// Service category chosen by the caller. Unknown tags are kept verbatim so
/// the generic templates can echo them back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Concept,
    CodeGeneration,
    ProjectDesign,
    LearningPlan,
    Other(String),
}

impl Category {
    pub const KNOWN: [Category; 4] = [
        Category::Concept,
        Category::CodeGeneration,
        Category::ProjectDesign,
        Category::LearningPlan,
    ];

    pub fn parse(tag: &str) -> Self {
        let norm = tag.trim().to_lowercase().replace(['_', ' '], "-");
        match norm.as_str() {
            "concept" => Category::Concept,
            "code-generation" | "code" | "codegen" => Category::CodeGeneration,
            "project-design" | "project" => Category::ProjectDesign,
            "learning-plan" | "learning" => Category::LearningPlan,
            _ => Category::Other(tag.trim().to_string()),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Category::Concept => "concept",
            Category::CodeGeneration => "code-generation",
            Category::ProjectDesign => "project-design",
            Category::LearningPlan => "learning-plan",
            Category::Other(tag) => tag,
        }
    }
}

impl From<String> for Category {
    fn from(tag: String) -> Self {
        Category::parse(&tag)
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        c.tag().to_string()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One user submission. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    category: Category,
    fields: BTreeMap<String, String>,
}

impl Request {
    pub fn new(category: Category, fields: BTreeMap<String, String>) -> Self {
        Self { category, fields }
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    /// Missing fields read as empty text.
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }
}

/// The three ordered generation steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Explain,
    Design,
    Implement,
}

impl Stage {
    pub const ORDER: [Stage; 3] = [Stage::Explain, Stage::Design, Stage::Implement];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Explain => "explanation",
            Stage::Design => "design",
            Stage::Implement => "implementation",
        }
    }

    fn failure_prefix(self) -> &'static str {
        match self {
            Stage::Explain => "An error occurred during concept analysis",
            Stage::Design => "An error occurred during prompt design",
            Stage::Implement => "An error occurred during code implementation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub const NO_RESPONSE_MESSAGE: &str = "No response was received from the AI model. Please try again.";
pub const SKIPPED_MESSAGE: &str = "This stage was skipped because an earlier stage failed.";
pub const SYSTEM_ERROR_MESSAGE: &str = "A system error occurred. Check your API key and try again.";

/// What a single stage produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Generated(String),
    ServiceError { detail: String },
    EmptyResponse,
    Skipped,
}

impl StageOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StageOutcome::Generated(_))
    }

    /// Renderable text: the generated content verbatim, otherwise the fixed
    /// message for this stage and condition.
    pub fn text(&self, stage: Stage) -> String {
        match self {
            StageOutcome::Generated(text) => text.clone(),
            StageOutcome::ServiceError { detail } => format!("{}: {}", stage.failure_prefix(), detail),
            StageOutcome::EmptyResponse => NO_RESPONSE_MESSAGE.to_string(),
            StageOutcome::Skipped => SKIPPED_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub explanation: String,
    pub design_notes: String,
    pub implementation: String,
}

impl PipelineResult {
    pub fn system_error() -> Self {
        Self {
            explanation: SYSTEM_ERROR_MESSAGE.to_string(),
            design_notes: SYSTEM_ERROR_MESSAGE.to_string(),
            implementation: SYSTEM_ERROR_MESSAGE.to_string(),
        }
    }

    pub fn get(&self, stage: Stage) -> &str {
        match stage {
            Stage::Explain => &self.explanation,
            Stage::Design => &self.design_notes,
            Stage::Implement => &self.implementation,
        }
    }
}
