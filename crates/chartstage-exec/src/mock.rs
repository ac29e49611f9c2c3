//! Mock command runner for testing
//!
//! Records every invocation and answers from a handler closure, so the
//! layers above can be tested without the package manager installed.

use std::sync::{Arc, PoisonError, RwLock};

use crate::error::Result;
use crate::process::{CommandOutput, CommandRunner, RunOptions};

type Handler = dyn Fn(&[String]) -> Result<CommandOutput> + Send + Sync;

/// A recorded call
#[derive(Debug, Clone)]
pub struct Invocation {
    pub argv: Vec<String>,
    pub options: RunOptions,
}

impl Invocation {
    /// The arguments after the program name
    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or_default()
    }

    /// Check whether the arguments start with `prefix`
    pub fn starts_with(&self, prefix: &[&str]) -> bool {
        let args = self.args();
        args.len() >= prefix.len() && args.iter().zip(prefix).all(|(a, p)| a == p)
    }
}

/// In-memory runner for tests
#[derive(Clone)]
pub struct MockRunner {
    invocations: Arc<RwLock<Vec<Invocation>>>,
    handler: Arc<Handler>,
}

impl MockRunner {
    /// Every command succeeds with no output
    pub fn new() -> Self {
        Self::with_handler(|_| Ok(CommandOutput::new(0, "")))
    }

    /// Answer every command with `handler`
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&[String]) -> Result<CommandOutput> + Send + Sync + 'static,
    {
        Self {
            invocations: Arc::new(RwLock::new(Vec::new())),
            handler: Arc::new(handler),
        }
    }

    /// All recorded invocations, oldest first
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of invocations whose arguments start with `prefix`
    pub fn count(&self, prefix: &[&str]) -> usize {
        self.invocations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|inv| inv.starts_with(prefix))
            .count()
    }

    /// Forget recorded invocations
    pub fn reset(&self) {
        self.invocations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockRunner")
            .field("invocations", &self.invocations().len())
            .finish_non_exhaustive()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, argv: &[String], options: &RunOptions) -> Result<CommandOutput> {
        self.invocations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Invocation {
                argv: argv.to_vec(),
                options: options.clone(),
            });
        (self.handler)(argv)
    }
}
