//! Collaborators of the executor: where rules go and where included
//! files come from.

use std::fmt;
use std::path::PathBuf;

use kmk_ir::Location;
use rustc_hash::FxHashMap;

/// A rule as collected by the executor. Targets and prerequisites are
/// expanded; recipe lines are kept verbatim.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Rule {
    pub targets: Vec<String>,
    pub prereqs: Vec<String>,
    pub order_only: Vec<String>,
    pub double_colon: bool,
    pub location: Location,
    pub commands: Vec<String>,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            self.targets.join(" "),
            if self.double_colon { "::" } else { ":" }
        )?;
        for prereq in &self.prereqs {
            write!(f, " {prereq}")?;
        }
        if !self.order_only.is_empty() {
            write!(f, " | {}", self.order_only.join(" "))?;
        }
        for command in &self.commands {
            write!(f, "\n\t{command}")?;
        }
        Ok(())
    }
}

/// Receives rules in evaluation order.
pub trait RecipeSink {
    fn start_rule(&mut self, rule: Rule);

    /// Append a recipe line to the rule started last.
    fn add_command(&mut self, line: &str);
}

/// [`RecipeSink`] that keeps every rule.
#[derive(Clone, Debug, Default)]
pub struct RuleList {
    rules: Vec<Rule>,
}

impl RuleList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule naming `target`.
    pub fn find(&self, target: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.targets.iter().any(|t| t == target))
    }
}

impl RecipeSink for RuleList {
    fn start_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    fn add_command(&mut self, line: &str) {
        if let Some(rule) = self.rules.last_mut() {
            rule.commands.push(line.to_owned());
        }
    }
}

/// Supplies the text of included files.
pub trait IncludeResolver {
    /// Contents of `file`, or `None` if it does not exist.
    fn load(&mut self, file: &str) -> Option<String>;
}

/// Includes served from memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryIncludes {
    files: FxHashMap<String, String>,
}

impl MemoryIncludes {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_file(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(name, text);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.files.insert(name.into(), text.into());
    }
}

impl IncludeResolver for MemoryIncludes {
    fn load(&mut self, file: &str) -> Option<String> {
        self.files.get(file).cloned()
    }
}

/// Includes read from the file system, relative to `base`.
#[derive(Clone, Debug)]
pub struct FsIncludes {
    base: PathBuf,
}

impl FsIncludes {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        FsIncludes { base: base.into() }
    }
}

impl IncludeResolver for FsIncludes {
    fn load(&mut self, file: &str) -> Option<String> {
        let path = self.base.join(file);
        match std::fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(err) => {
                tracing::debug!(path = %path.display(), %err, "include not readable");
                None
            }
        }
    }
}
