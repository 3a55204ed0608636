use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How recursive calls are made available to the body of a function goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FixpointStrategy {
    DisableFixpoint,
    FirstArgument,
    AllArguments,
}

impl Default for FixpointStrategy {
    fn default() -> Self {
        FixpointStrategy::FirstArgument
    }
}

/// Bounds and switches for one synthesis attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerParams {
    /// Maximum application depth of guessed elimination terms.
    pub e_guess_depth: usize,
    /// Application depth used when guessing a match scrutinee.
    pub scrutinee_depth: usize,
    pub match_depth: usize,
    pub cond_depth: usize,
    pub fix_strategy: FixpointStrategy,
    pub poly_recursion: bool,
    /// Solve after every emitted constraint rather than once at the end.
    pub incremental_solving: bool,
}

impl Default for ExplorerParams {
    fn default() -> Self {
        ExplorerParams {
            e_guess_depth: 3,
            scrutinee_depth: 1,
            match_depth: 2,
            cond_depth: 1,
            fix_strategy: FixpointStrategy::default(),
            poly_recursion: true,
            incremental_solving: true,
        }
    }
}

impl ExplorerParams {
    pub fn load(path: &Path) -> Result<ExplorerParams> {
        if !path.exists() {
            return Ok(ExplorerParams::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        ExplorerParams::from_toml_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(text: &str) -> Result<ExplorerParams> {
        let params: ExplorerParams = toml::from_str(text)?;
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{ExplorerParams, FixpointStrategy};

    #[test]
    fn partial_files_keep_defaults() {
        let params = ExplorerParams::from_toml_str(
            "match_depth = 0\nfix_strategy = \"all-arguments\"\n",
        )
        .unwrap();
        assert_eq!(params.match_depth, 0);
        assert_eq!(params.fix_strategy, FixpointStrategy::AllArguments);
        assert_eq!(params.e_guess_depth, 3);
        assert!(params.incremental_solving);
    }

    #[test]
    fn missing_file_is_default() {
        let params = ExplorerParams::load(Path::new("/nonexistent/refsyn.toml")).unwrap();
        assert_eq!(params, ExplorerParams::default());
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        assert!(ExplorerParams::from_toml_str("fix_strategy = \"sometimes\"").is_err());
    }
}
