use std::error::Error;

use pyb_domain::SolverProblemError;

const PYTHON_REQUIREMENT_PREFIX: &str = "The current project's Python requirement ";
const PYTHON_REQUIREMENT_SUFFIX: &str =
    " is not compatible with some of the required packages Python requirement";

/// A suggested remediation for a failure.
pub trait Solution: Send + Sync {
    fn title(&self) -> String;
    fn description(&self) -> String;
    fn documentation_links(&self) -> Vec<String>;
}

/// Recognises a class of failures and proposes remediations for them.
pub trait HasSolutionsForError: Send + Sync {
    fn can_solve(&self, error: &(dyn Error + 'static)) -> bool;
    fn solutions(&self, error: &(dyn Error + 'static)) -> Vec<Box<dyn Solution>>;
}

// Returns the requirement text between the fixed prefix and suffix, if the
// message starts with the prefix and contains the suffix after it.
fn captured_requirement(message: &str) -> Option<&str> {
    let rest = message.strip_prefix(PYTHON_REQUIREMENT_PREFIX)?;
    let end = rest.find(PYTHON_REQUIREMENT_SUFFIX)?;
    let requirement = &rest[..end];
    (!requirement.is_empty()).then_some(requirement)
}

pub struct PythonRequirementSolution {
    error: SolverProblemError,
}

impl PythonRequirementSolution {
    pub fn new(error: SolverProblemError) -> Self {
        Self { error }
    }
}

impl Solution for PythonRequirementSolution {
    fn title(&self) -> String {
        "Check your dependencies Python requirement.".to_string()
    }

    fn description(&self) -> String {
        let requirement = captured_requirement(self.error.message()).unwrap_or("(unknown)");
        format!(
            "The Python requirement {requirement} of the project is wider than what some \
             dependencies support.\nRestrict `requires-python` in pyproject.toml to a range \
             every locked package accepts, or pick dependency versions that support the \
             project's full range, then re-lock."
        )
    }

    fn documentation_links(&self) -> Vec<String> {
        vec![
            "https://packaging.python.org/en/latest/specifications/core-metadata/#requires-python"
                .to_string(),
            "https://peps.python.org/pep-0440/#version-specifiers".to_string(),
        ]
    }
}

/// Matches the "Python requirement is not compatible" resolution failure.
#[derive(Default)]
pub struct PythonRequirementIncompatibilitySolutionProvider;

impl HasSolutionsForError for PythonRequirementIncompatibilitySolutionProvider {
    fn can_solve(&self, error: &(dyn Error + 'static)) -> bool {
        error
            .downcast_ref::<SolverProblemError>()
            .is_some_and(|problem| captured_requirement(problem.message()).is_some())
    }

    fn solutions(&self, error: &(dyn Error + 'static)) -> Vec<Box<dyn Solution>> {
        match error.downcast_ref::<SolverProblemError>() {
            Some(problem) if captured_requirement(problem.message()).is_some() => {
                vec![Box::new(PythonRequirementSolution::new(problem.clone()))]
            }
            _ => Vec::new(),
        }
    }
}

#[derive(Default)]
pub struct SolutionProviderRepository {
    providers: Vec<Box<dyn HasSolutionsForError>>,
}

impl SolutionProviderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository holding every built-in provider.
    pub fn with_defaults() -> Self {
        let mut repository = Self::new();
        repository.register(Box::new(PythonRequirementIncompatibilitySolutionProvider));
        repository
    }

    pub fn register(&mut self, provider: Box<dyn HasSolutionsForError>) {
        self.providers.push(provider);
    }

    /// Solutions from every provider that recognises `error` or one of its sources.
    pub fn solutions_for(&self, error: &(dyn Error + 'static)) -> Vec<Box<dyn Solution>> {
        let mut found = Vec::new();
        let mut current = Some(error);
        while let Some(err) = current {
            for provider in &self.providers {
                if provider.can_solve(err) {
                    found.extend(provider.solutions(err));
                }
            }
            if !found.is_empty() {
                break;
            }
            current = err.source();
        }
        found
    }
}
