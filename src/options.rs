use serde::{Deserialize, Serialize};
use std::path::PathBuf;
/// What the walk does when a nested directory cannot be listed or a file
/// cannot be visited.
///
/// A failure to list the root is always returned to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Abort the whole walk with the first error.
    #[default]
    Strict,
    /// Log the failure, remember the failed path and carry on with the next sibling.
    Isolate,
}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpiderOptions {
    pub root: PathBuf,
    pub failure_policy: FailurePolicy,
    pub max_depth: Option<usize>,
    pub ignore_patterns: Vec<String>,
}
impl Default for SpiderOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            failure_policy: FailurePolicy::Strict,
            max_depth: None,
            ignore_patterns: Vec::new(),
        }
    }
}
#[derive(Debug, Default)]
pub struct SpiderBuilder {
    options: SpiderOptions,
}
impl SpiderBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            options: SpiderOptions {
                root: root.into(),
                ..Default::default()
            },
        }
    }
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.options.failure_policy = policy;
        self
    }
    /// Children of the root are at depth 1. A directory at `depth` is still
    /// recorded and visited, it is just not descended into. A depth of 0
    /// lists the root and records nothing below it.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.options.max_depth = Some(depth);
        self
    }
    pub fn no_limit_depth(mut self) -> Self {
        self.options.max_depth = None;
        self
    }
    pub fn ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.options.ignore_patterns = patterns;
        self
    }
    pub fn build(self) -> SpiderOptions {
        self.options
    }
}
