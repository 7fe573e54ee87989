//! Subcommand Registry & Dispatcher
//!
//! A registry maps command names to either a leaf subcommand or a nested
//! registry, in insertion order (which is also help order). Dispatch walks
//! the tree one positional token at a time and runs the matched leaf with
//! the remaining arguments. Input errors from a leaf are tagged with its
//! command path; other errors are returned untouched.

use std::future::Future;
use std::pin::Pin;

use crate::context::CommandContext;
use crate::errors::{CliError, RegistryError};
use crate::exit_codes;

/// Future returned by a subcommand's `run`
pub type RunFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + 'a>>;

/// Entry point of a leaf subcommand
pub type RunFn = for<'a> fn(Vec<String>, Invocation, &'a mut CommandContext) -> RunFuture<'a>;

/// Per-call context handed to a leaf
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Command path of the registry the leaf was found in, e.g. `socket dependencies`
    pub parent_name: String,
    /// The leaf's own name, e.g. `search`
    pub name: String,
}

impl Invocation {
    /// Full command path, e.g. `socket dependencies search`
    pub fn command_path(&self) -> String {
        format!("{} {}", self.parent_name, self.name)
    }
}

/// A leaf subcommand
#[derive(Clone, Copy)]
pub struct Subcommand {
    pub description: &'static str,
    pub run: RunFn,
}

/// A nested registry with its own description
pub struct Group {
    pub description: &'static str,
    pub registry: Registry,
}

/// Registry entry
pub enum Node {
    Leaf(Subcommand),
    Group(Group),
}

impl Node {
    pub fn description(&self) -> &'static str {
        match self {
            Node::Leaf(leaf) => leaf.description,
            Node::Group(group) => group.description,
        }
    }
}

/// Ordered routing table from command name to node
#[derive(Default)]
pub struct Registry {
    entries: Vec<(String, Node)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node; names must be unique within one registry
    pub fn register(&mut self, name: &str, node: Node) -> Result<(), RegistryError> {
        if self.get(name).is_some() {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        self.entries.push((name.to_string(), node));
        Ok(())
    }

    /// Builder form of [`Registry::register`] for a leaf
    pub fn with_leaf(
        mut self,
        name: &str,
        description: &'static str,
        run: RunFn,
    ) -> Result<Self, RegistryError> {
        self.register(name, Node::Leaf(Subcommand { description, run }))?;
        Ok(self)
    }

    /// Builder form of [`Registry::register`] for a nested registry
    pub fn with_group(
        mut self,
        name: &str,
        description: &'static str,
        registry: Registry,
    ) -> Result<Self, RegistryError> {
        self.register(
            name,
            Node::Group(Group {
                description,
                registry,
            }),
        )?;
        Ok(self)
    }

    /// Exact, case-sensitive lookup
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, node)| node)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Usage line plus a `name  description` table
    pub fn help_text(&self, root_name: &str) -> String {
        let width = self
            .entries
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0);

        let mut out = format!("Usage: {} <command>\n\nCommands:\n", root_name);
        for (name, node) in &self.entries {
            out.push_str(&format!(
                "  {:<width$}  {}\n",
                name,
                node.description(),
                width = width
            ));
        }
        out.push_str(&format!(
            "\nRun `{} <command> --help` for more information on a command.",
            root_name
        ));
        out
    }
}

/// Result of routing one argument vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A leaf ran to completion
    Ran,
    /// Help was explicitly requested
    Help,
    /// No subcommand was given where one is required
    Missing,
    /// The given name is not registered
    Unknown(String),
}

impl DispatchOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            DispatchOutcome::Ran | DispatchOutcome::Help => exit_codes::SUCCESS,
            DispatchOutcome::Missing | DispatchOutcome::Unknown(_) => exit_codes::FAILURE,
        }
    }
}

fn is_help_flag(arg: &str) -> bool {
    arg == "--help" || arg == "-h"
}

/// Route `argv` through `registry` and run the matched leaf
pub async fn dispatch(
    registry: &Registry,
    argv: &[String],
    root_name: &str,
    ctx: &mut CommandContext,
) -> anyhow::Result<DispatchOutcome> {
    let mut registry = registry;
    let mut argv = argv;
    let mut parent_name = root_name.to_string();

    loop {
        let Some(candidate) = argv.first() else {
            tracing::debug!("No subcommand given to `{}`", parent_name);
            ctx.output.eprint(&registry.help_text(&parent_name));
            return Ok(DispatchOutcome::Missing);
        };

        if is_help_flag(candidate) {
            println!("{}", registry.help_text(&parent_name));
            return Ok(DispatchOutcome::Help);
        }

        match registry.get(candidate) {
            None => {
                tracing::debug!("Unknown subcommand `{}` for `{}`", candidate, parent_name);
                ctx.output.error(&format!(
                    "Unknown command `{}` for `{}`",
                    candidate, parent_name
                ));
                ctx.output.eprint(&registry.help_text(&parent_name));
                return Ok(DispatchOutcome::Unknown(candidate.clone()));
            }
            Some(Node::Group(group)) => {
                parent_name = format!("{} {}", parent_name, candidate);
                registry = &group.registry;
                argv = &argv[1..];
            }
            Some(Node::Leaf(leaf)) => {
                tracing::debug!("Running `{} {}`", parent_name, candidate);
                let invocation = Invocation {
                    parent_name,
                    name: candidate.clone(),
                };
                let command_path = invocation.command_path();
                if let Err(mut err) = (leaf.run)(argv[1..].to_vec(), invocation, ctx).await {
                    if let Some(cli_err) = err.downcast_mut::<CliError>() {
                        cli_err.set_command_path(&command_path);
                    }
                    return Err(err);
                }
                return Ok(DispatchOutcome::Ran);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_context;
    use std::cell::RefCell;

    thread_local! {
        static CALLS: RefCell<Vec<(&'static str, Vec<String>, Invocation)>> =
            const { RefCell::new(Vec::new()) };
    }

    fn record(label: &'static str, args: Vec<String>, invocation: Invocation) {
        CALLS.with(|calls| calls.borrow_mut().push((label, args, invocation)));
    }

    fn take_calls() -> Vec<(&'static str, Vec<String>, Invocation)> {
        CALLS.with(|calls| std::mem::take(&mut *calls.borrow_mut()))
    }

    fn run_alpha(args: Vec<String>, invocation: Invocation, _ctx: &mut CommandContext) -> RunFuture<'_> {
        Box::pin(async move {
            record("alpha", args, invocation);
            anyhow::Ok(())
        })
    }

    fn run_search(args: Vec<String>, invocation: Invocation, _ctx: &mut CommandContext) -> RunFuture<'_> {
        Box::pin(async move {
            record("search", args, invocation);
            anyhow::Ok(())
        })
    }

    fn run_failing(_args: Vec<String>, _invocation: Invocation, _ctx: &mut CommandContext) -> RunFuture<'_> {
        Box::pin(async move { anyhow::Result::<()>::Err(CliError::input("bad flag").into()) })
    }

    fn registry() -> Result<Registry, RegistryError> {
        let nested = Registry::new()
            .with_leaf("search", "Search dependencies", run_search)?
            .with_leaf("fail", "Always fails", run_failing)?;
        Registry::new()
            .with_leaf("alpha", "First command", run_alpha)?
            .with_group("dependencies", "Dependency operations", nested)?
            .with_leaf("fail", "Always fails", run_failing)
    }

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_leaf_runs_once_with_remaining_args() -> anyhow::Result<()> {
        take_calls();
        let mut ctx = test_context();
        let outcome = dispatch(&registry()?, &argv(&["alpha", "x", "--y"]), "socket", &mut ctx).await?;

        assert_eq!(outcome, DispatchOutcome::Ran);
        assert_eq!(outcome.exit_code(), 0);
        let calls = take_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "alpha");
        assert_eq!(calls[0].1, argv(&["x", "--y"]));
        assert_eq!(calls[0].2.parent_name, "socket");
        Ok(())
    }

    #[tokio::test]
    async fn test_nested_registry_accumulates_parent_name() -> anyhow::Result<()> {
        take_calls();
        let mut ctx = test_context();
        let outcome = dispatch(
            &registry()?,
            &argv(&["dependencies", "search", "--limit", "5"]),
            "socket",
            &mut ctx,
        )
        .await?;

        assert_eq!(outcome, DispatchOutcome::Ran);
        let calls = take_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, argv(&["--limit", "5"]));
        assert_eq!(calls[0].2.parent_name, "socket dependencies");
        assert_eq!(calls[0].2.command_path(), "socket dependencies search");
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_and_missing_never_run_a_leaf() -> anyhow::Result<()> {
        take_calls();
        let mut ctx = test_context();
        let registry = registry()?;

        let outcome = dispatch(&registry, &argv(&["beta"]), "socket", &mut ctx).await?;
        assert_eq!(outcome, DispatchOutcome::Unknown("beta".into()));
        assert_ne!(outcome.exit_code(), 0);

        // Case-sensitive and no prefix matching
        let outcome = dispatch(&registry, &argv(&["Alpha"]), "socket", &mut ctx).await?;
        assert_eq!(outcome, DispatchOutcome::Unknown("Alpha".into()));
        let outcome = dispatch(&registry, &argv(&["alp"]), "socket", &mut ctx).await?;
        assert_eq!(outcome, DispatchOutcome::Unknown("alp".into()));

        let outcome = dispatch(&registry, &[], "socket", &mut ctx).await?;
        assert_eq!(outcome, DispatchOutcome::Missing);
        assert_ne!(outcome.exit_code(), 0);

        let outcome = dispatch(&registry, &argv(&["dependencies"]), "socket", &mut ctx).await?;
        assert_eq!(outcome, DispatchOutcome::Missing);

        assert!(take_calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_help_flag_exits_zero() -> anyhow::Result<()> {
        take_calls();
        let mut ctx = test_context();
        let registry = registry()?;

        for flag in ["--help", "-h"] {
            let outcome = dispatch(&registry, &argv(&[flag, "alpha"]), "socket", &mut ctx).await?;
            assert_eq!(outcome, DispatchOutcome::Help);
            assert_eq!(outcome.exit_code(), 0);
        }
        let outcome = dispatch(&registry, &argv(&["dependencies", "--help"]), "socket", &mut ctx).await?;
        assert_eq!(outcome, DispatchOutcome::Help);
        assert!(take_calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_leaf_error_propagates() -> anyhow::Result<()> {
        let mut ctx = test_context();
        let err = dispatch(&registry()?, &argv(&["fail"]), "socket", &mut ctx)
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<CliError>().is_some_and(CliError::is_input));
        Ok(())
    }

    #[tokio::test]
    async fn test_input_error_carries_leaf_command_path() -> anyhow::Result<()> {
        let mut ctx = test_context();
        let err = dispatch(&registry()?, &argv(&["dependencies", "fail"]), "socket", &mut ctx)
            .await
            .unwrap_err();
        let cli_err = err.downcast_ref::<CliError>();
        assert_eq!(
            cli_err.and_then(CliError::command_path),
            Some("socket dependencies fail")
        );
        Ok(())
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = Registry::new()
            .with_leaf("alpha", "First", run_alpha)
            .and_then(|r| r.with_leaf("alpha", "Again", run_search));
        assert_eq!(result.err(), Some(RegistryError::Duplicate("alpha".into())));
    }

    #[test]
    fn test_help_text_in_insertion_order() -> anyhow::Result<()> {
        let help = registry()?.help_text("socket");
        assert!(help.starts_with("Usage: socket <command>"));

        let alpha = help.find("alpha").unwrap_or(usize::MAX);
        let deps = help.find("dependencies").unwrap_or(usize::MAX);
        let fail = help.find("fail ").unwrap_or(usize::MAX);
        assert!(alpha < deps && deps < fail);
        assert!(help.contains("  dependencies  Dependency operations"));
        Ok(())
    }
}
