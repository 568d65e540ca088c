use regex::{Captures, Regex};
use std::sync::OnceLock;

use crate::wire::{Category, Request, Stage};

/// One row of the template table: which request fields a category
/// interpolates, which of them a submission must fill in, and one template
/// per stage with `{field}` placeholders.
pub struct CategoryTemplates {
    pub fields: &'static [&'static str],
    pub required: &'static [&'static str],
    explain: &'static str,
    design: &'static str,
    implement: &'static str,
}

impl CategoryTemplates {
    fn template(&self, stage: Stage) -> &'static str {
        match stage {
            Stage::Explain => self.explain,
            Stage::Design => self.design,
            Stage::Implement => self.implement,
        }
    }
}

static CONCEPT: CategoryTemplates = CategoryTemplates {
    fields: &["question"],
    required: &["question"],
    explain: r#"Give a foundational explanation for the following question about vibe coding:

{question}

Cover these points:
1. What vibe coding is and its core principles
2. How vibe coding differs from conventional coding
3. How it works (natural-language understanding, the code generation loop)
4. Strengths, weaknesses and the use cases it suits
5. The basic ingredients of effective vibe coding"#,
    design: r#"Propose effective prompt design for vibe coding concepts:

1. Prompt structure optimised for vibe coding
   - Clear prompt components
   - Reusable prompt templates
   - Balancing detail against clarity

2. Prompt patterns and examples
   - Patterns for different coding tasks
   - Example prompts for real use cases
   - Common prompt mistakes and how to fix them

3. Prompt optimisation techniques
   - Reducing ambiguity
   - Iterative refinement

Question:
{question}"#,
    implement: r#"Show the vibe coding concepts as working code:

1. Concept demonstrations
   - Small demo code illustrating the concept
   - A basic framework for working with vibe coding
   - A worked natural-language-to-code example

2. The vibe coding workflow in code
   - From writing the prompt to generating the code
   - Snippets for a real implementation
   - Error handling and refinement loops

3. Implementation pitfalls and optimisation points
   - Common problems and their fixes
   - Code quality techniques
   - Maintainability concerns

Question:
{question}"#,
};

static CODE_GENERATION: CategoryTemplates = CategoryTemplates {
    fields: &["code_request", "programming_language"],
    required: &["code_request", "programming_language"],
    explain: r#"Give a conceptual vibe coding analysis of this code request:

Code request:
{code_request}

Programming language:
{programming_language}

Cover these points:
1. Request analysis
   - Core functional requirements
   - Required code components and structure
   - Likely complexity and caveats

2. Applying vibe coding
   - Turning the natural-language request into a code structure
   - A conceptual model for generating the code
   - Handling ambiguity in the request

3. Structure of the code to be generated
   - Expected core algorithms and patterns
   - Data flow and interactions
   - Optimisation considerations"#,
    design: r#"Design an optimised vibe coding prompt for generating this code:

1. Structuring the code generation prompt
   - Stating functional requirements clearly
   - Including input/output examples
   - Directing code style and quality

2. Language-specific prompt patterns
   - Prompt structure tuned for {programming_language}
   - Language-specific considerations
   - Naming the language's idioms and patterns

3. A concrete prompt for this request
   - The optimised prompt itself
   - Extra instructions that head off likely problems
   - Variations for iterative refinement

Code request:
{code_request}

Programming language:
{programming_language}"#,
    implement: r#"Provide the working implementation of the requested code and an optimised version:

1. Base implementation
   - Complete code for the requested functionality
   - Explanation of the main logic and algorithms
   - Required dependencies and setup

2. Optimisation and refinement
   - Performance improvements
   - Clean code principles
   - Robustness and error handling

3. Usage and examples
   - How to call and use the code
   - Sample runs and expected output
   - Variations for different scenarios

Code request:
{code_request}

Programming language:
{programming_language}"#,
};

static PROJECT_DESIGN: CategoryTemplates = CategoryTemplates {
    fields: &["project_description", "tech_stack"],
    required: &["project_description", "tech_stack"],
    explain: r#"Explain the conceptual approach to applying vibe coding to this project:

Project description:
{project_description}

Tech stack:
{tech_stack}

Cover these points:
1. Areas of the project where vibe coding applies
2. What vibe coding brings to this project
3. Technical constraints and limits to keep in mind
4. A vibe coding approach for building the project
5. Combining vibe coding with conventional development"#,
    design: r#"Design effective vibe coding prompts for this project:

1. Turning project requirements into prompts
   - Defining the project scope
   - Stating functional and non-functional requirements
   - Including the tech stack and constraints

2. Prompt patterns for structuring the project
   - Templates for architecture design
   - Strategies for decomposing components
   - Prompt chains for incremental development

3. Concrete prompts for this project
   - Prompts that apply directly to this project
   - Variation and iteration strategies
   - A prompt completeness checklist

Project description:
{project_description}

Tech stack:
{tech_stack}"#,
    implement: r#"Provide the vibe coding implementation approach and real code for this project:

1. Project structure and core components
   - A code skeleton for the architecture
   - Main modules and types
   - Interfaces and data models

2. Core feature implementations
   - Detailed code for the key features
   - Integration and data flow between features
   - Error handling

3. Performance and quality
   - Efficiency improvements
   - Refactoring approach
   - Testing and verification strategy

Project description:
{project_description}

Tech stack:
{tech_stack}"#,
};

static LEARNING_PLAN: CategoryTemplates = CategoryTemplates {
    fields: &["current_level", "learning_goals"],
    required: &["learning_goals", "preferred_languages"],
    explain: r#"Explain the conceptual foundations and approach for learning vibe coding:

Current level:
{current_level}

Learning goals:
{learning_goals}

Cover these points:
1. Foundations of learning vibe coding
   - Core knowledge areas and principles
   - How natural language connects to code
   - Conceptual basis of writing effective prompts

2. A staged conceptual approach
   - Key concepts for beginners
   - Deeper principles for intermediate learners
   - A framework for applying it professionally

3. Building vibe coding skills
   - Principles of effective natural-language prompts
   - Understanding and evaluating generated code
   - Connecting vibe coding with existing coding knowledge"#,
    design: r#"Propose prompt patterns and design methods for learning vibe coding:

1. Prompt design strategy per learning stage
   - Simple prompt patterns for beginners
   - Extensible templates for intermediate learners
   - System-design prompts for advanced learners

2. Effective learning prompt patterns
   - Asking for explanations
   - Asking for code
   - Asking for code review and improvement

3. Growing prompt-writing skill
   - Practice routines
   - Feedback-driven improvement
   - Building a personal prompt pattern library

Current level:
{current_level}

Learning goals:
{learning_goals}"#,
    implement: r#"Provide real code examples and a hands-on guide for learning vibe coding:

1. Code examples per learning stage
   - A basic example for beginners
   - An extended example for intermediate learners
   - A larger system example for advanced learners

2. Practice project guide
   - Step-by-step mini project code
   - Exercises for core skills
   - Portfolio project ideas

3. Resources for self-directed learning
   - Repositories and projects worth studying
   - A small progress tracking tool
   - Using study groups and code review

Current level:
{current_level}

Learning goals:
{learning_goals}"#,
};

const GENERIC_EXPLAIN: &str = r#"Explain the following {category} request from the perspective of vibe coding concepts:

Request:
{request}

Include the basic concepts, principles and how to apply them."#;

const GENERIC_DESIGN: &str = r#"Analyse the following {category} request from a prompt design perspective:

Request:
{request}

Give concrete prompt structures, patterns and examples."#;

const GENERIC_IMPLEMENT: &str = r#"Provide a code implementation for the following {category} request:

Request:
{request}

Include runnable code, usage instructions and caveats."#;

pub fn templates_for(category: &Category) -> Option<&'static CategoryTemplates> {
    match category {
        Category::Concept => Some(&CONCEPT),
        Category::CodeGeneration => Some(&CODE_GENERATION),
        Category::ProjectDesign => Some(&PROJECT_DESIGN),
        Category::LearningPlan => Some(&LEARNING_PLAN),
        Category::Other(_) => None,
    }
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([a-z_]+)\}").expect("static placeholder pattern"))
}

fn interpolate(template: &str, lookup: impl Fn(&str) -> String) -> String {
    placeholder_re()
        .replace_all(template, |caps: &Captures| lookup(&caps[1]))
        .into_owned()
}

/// Category prompt for one stage. Never fails; unknown categories fall back
/// to a generic template that echoes the tag and the serialized fields.
pub fn category_prompt(stage: Stage, request: &Request) -> String {
    match templates_for(request.category()) {
        Some(row) => {
            let mut out = interpolate(row.template(stage), |name| request.field(name).to_string());
            let extras = additional_details(row, request);
            if !extras.is_empty() {
                out.push_str("\n\nAdditional details:\n");
                out.push_str(&extras);
            }
            out
        }
        None => {
            let template = match stage {
                Stage::Explain => GENERIC_EXPLAIN,
                Stage::Design => GENERIC_DESIGN,
                Stage::Implement => GENERIC_IMPLEMENT,
            };
            let serialized = serde_json::to_string_pretty(request.fields()).unwrap_or_default();
            interpolate(template, |name| match name {
                "category" => request.category().tag().to_string(),
                "request" => serialized.clone(),
                _ => String::new(),
            })
        }
    }
}

/// Non-empty fields the category template does not interpolate.
fn additional_details(row: &CategoryTemplates, request: &Request) -> String {
    request
        .fields()
        .iter()
        .filter(|(k, v)| !row.fields.contains(&k.as_str()) && !v.trim().is_empty())
        .map(|(k, v)| format!("- {}: {}", k.replace('_', " "), v.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fixed identity text prepended to every prompt of a stage.
pub struct Persona {
    pub name: &'static str,
    pub role: &'static str,
    pub intro: &'static str,
}

pub fn persona(stage: Stage) -> &'static Persona {
    static EXPLAIN: Persona = Persona {
        name: "Concept Coach",
        role: "a vibe coding concepts coach",
        intro: "I explain the core ideas and principles of vibe coding so they are easy to follow. \
Vibe coding, introduced by Andrej Karpathy in February 2025, means describing features in natural \
language and letting an AI model write the code. I help you understand how that works.",
    };
    static DESIGN: Persona = Persona {
        name: "Prompt Coach",
        role: "a prompt engineering coach",
        intro: "I specialise in designing effective vibe coding prompts and patterns. \
With eight years of prompt engineering and NLP experience I show you how to write prompts that \
produce exactly the code you want.",
    };
    static IMPLEMENT: Persona = Persona {
        name: "Implementation Coach",
        role: "a code implementation coach",
        intro: "I specialise in implementing, optimising and debugging code produced through vibe coding. \
With ten years of software development and AI-assisted optimisation experience I deliver code that is \
efficient and practical.",
    };
    match stage {
        Stage::Explain => &EXPLAIN,
        Stage::Design => &DESIGN,
        Stage::Implement => &IMPLEMENT,
    }
}

fn output_directive(stage: Stage) -> &'static str {
    match stage {
        Stage::Explain => r#"Always include the basic concepts, principles, strengths and weaknesses of vibe coding.
Avoid jargon where you can so beginners can follow, but use precise technical terms where accuracy needs them.

Response format:
- A clear title and structured sections
- Concrete examples and real use cases
- Step-by-step explanations and practical tips
- Readable markdown"#,
        Stage::Design => r#"Always include effective prompt structures and patterns, concrete examples and optimisation strategies.

Response format:
- Practical prompt templates and examples
- A step-by-step prompt writing guide
- Common mistakes and how to improve on them
- Markdown with code blocks and examples"#,
        Stage::Implement => r#"The final answer must balance all three coaching perspectives:
1. Concept Coach (the basic ideas and principles of vibe coding)
2. Prompt Coach (effective prompt design and patterns)
3. Implementation Coach (working code and optimisation)

Provide a complete implementation guide with runnable, optimised code, usage and caveats.
Put code in fenced markdown code blocks tagged with the language (for example ```python).
Add explanations outside the code blocks where needed.

Response format:
- Complete runnable code
- Code explanation and usage
- Performance tips and caveats
- A structured markdown guide"#,
    }
}

fn upstream_header(stage: Stage) -> Option<(&'static str, &'static str, &'static str)> {
    match stage {
        Stage::Explain => None,
        Stage::Design => Some((
            "Review the following explanation from the Concept Coach and extend it from a prompt design perspective:",
            "=== Concept Coach explanation ===",
            "=== End of explanation ===",
        )),
        Stage::Implement => Some((
            "Review the following analysis from the Concept Coach and the Prompt Coach and complete the final implementation:",
            "=== Previous coaches' analysis ===",
            "=== End of analysis ===",
        )),
    }
}

/// Full prompt for a stage: persona preamble, prior-stage context (design
/// and implement only), the category prompt and the output directive.
pub fn stage_prompt(stage: Stage, prior: Option<&str>, request: &Request) -> String {
    let p = persona(stage);
    let mut out = format!("You are '{}', {}.\n{}\n\n", p.name, p.role, p.intro);
    if let (Some((lead, open, close)), Some(prior)) = (upstream_header(stage), prior) {
        out.push_str(&format!("{lead}\n\n{open}\n{prior}\n{close}\n\n"));
    }
    out.push_str(&category_prompt(stage, request));
    out.push_str("\n\n");
    out.push_str(output_directive(stage));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn req(category: Category, pairs: &[(&str, &str)]) -> Request {
        let fields = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Request::new(category, fields)
    }

    #[test]
    fn known_categories_render_with_empty_fields() {
        for c in Category::KNOWN {
            let row = templates_for(&c).unwrap();
            let fields: BTreeMap<String, String> =
                row.fields.iter().map(|f| (f.to_string(), String::new())).collect();
            let r = Request::new(c.clone(), fields);
            for stage in Stage::ORDER {
                let text = category_prompt(stage, &r);
                assert!(!text.trim().is_empty(), "{c} / {stage}");
                assert!(!text.contains('{'), "unrendered placeholder in {c} / {stage}");
            }
        }
    }

    #[test]
    fn fields_are_interpolated() {
        let r = req(
            Category::CodeGeneration,
            &[("code_request", "parse a CSV file"), ("programming_language", "Rust")],
        );
        let text = category_prompt(Stage::Design, &r);
        assert!(text.contains("parse a CSV file"));
        assert!(text.contains("Prompt structure tuned for Rust"));
    }

    #[test]
    fn unknown_category_uses_generic_template() {
        let r = req(Category::parse("code-review"), &[("snippet", "fn main() {}")]);
        for stage in Stage::ORDER {
            let text = category_prompt(stage, &r);
            assert!(text.contains("code-review"));
            assert!(text.contains("fn main() {}"));
        }
    }

    #[test]
    fn extra_fields_are_listed_as_details() {
        let r = req(
            Category::Concept,
            &[("question", "what is it?"), ("experience_level", "beginner"), ("specifics", "  ")],
        );
        let text = category_prompt(Stage::Explain, &r);
        assert!(text.contains("Additional details:\n- experience level: beginner"));
        assert!(!text.contains("specifics"));
    }

    #[test]
    fn stage_prompt_wraps_prior_output() {
        let r = req(Category::Concept, &[("question", "why?")]);
        let explain = stage_prompt(Stage::Explain, Some("ignored"), &r);
        assert!(explain.contains("Concept Coach"));
        assert!(!explain.contains("ignored"));

        let design = stage_prompt(Stage::Design, Some("EARLIER TEXT"), &r);
        assert!(design.contains("=== Concept Coach explanation ===\nEARLIER TEXT\n"));
        assert!(design.contains("Prompt Coach"));
    }
}
