//! Migration plans and the planner that writes them into a directory.

use super::dir::Dir;
use super::error::MigrateError;
use super::hash;
use crate::driver::{CancelToken, Driver};
use crate::schema::Realm;
use chrono::Utc;

/// One step of a plan: the forward command, its reverse, and an optional
/// comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanChange {
    /// Forward SQL statement.
    pub cmd: String,
    /// Statement reversing `cmd`, when the dialect can produce one.
    pub reverse: Option<String>,
    /// Human-readable annotation.
    pub comment: Option<String>,
}

impl PlanChange {
    /// Create a forward-only change.
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            reverse: None,
            comment: None,
        }
    }

    /// Attach the reversing statement.
    pub fn with_reverse(mut self, reverse: impl Into<String>) -> Self {
        self.reverse = Some(reverse.into());
        self
    }

    /// Attach a comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// An ordered list of SQL commands migrating a database forward.
///
/// Produced once by a driver, written once by the planner, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Plan {
    /// Plan name; becomes part of the migration file name.
    pub name: String,
    /// Ordered changes.
    pub changes: Vec<PlanChange>,
}

impl Plan {
    /// Create an empty named plan.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            changes: Vec::new(),
        }
    }

    /// Append a change.
    pub fn with_change(mut self, change: PlanChange) -> Self {
        self.changes.push(change);
        self
    }
}

/// A file produced by a formatter, ready to be written to a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanFile {
    /// File name.
    pub name: String,
    /// File contents.
    pub content: Vec<u8>,
}

/// Serializes a plan into one or more migration files.
pub trait PlanFormatter {
    /// Render the plan.
    fn format(&self, plan: &Plan) -> Result<Vec<PlanFile>, MigrateError>;
}

/// The default format: one `{timestamp}_{name}.sql` file holding every
/// forward command terminated by `;`. The UTC timestamp is sampled once
/// per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFormatter;

impl PlanFormatter for DefaultFormatter {
    fn format(&self, plan: &Plan) -> Result<Vec<PlanFile>, MigrateError> {
        let ts = Utc::now().format("%Y%m%d%H%M%S");
        let mut content = String::new();
        for change in &plan.changes {
            content.push_str(&change.cmd);
            content.push_str(";\n");
        }
        Ok(vec![PlanFile {
            name: format!("{ts}_{}.sql", plan.name),
            content: content.into_bytes(),
        }])
    }
}

type Template = Box<dyn Fn(&Plan) -> String + Send + Sync>;

/// A formatter built from ordered (name template, body template) pairs;
/// each pair yields one file. Used for multi-file layouts such as
/// `.up.sql` / `.down.sql`.
#[derive(Default)]
pub struct TemplateFormatter {
    parts: Vec<(Template, Template)>,
}

impl TemplateFormatter {
    /// Create a formatter with no parts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one (name, body) template pair.
    pub fn with_part(
        mut self,
        name: impl Fn(&Plan) -> String + Send + Sync + 'static,
        body: impl Fn(&Plan) -> String + Send + Sync + 'static,
    ) -> Self {
        self.parts.push((Box::new(name), Box::new(body)));
        self
    }
}

impl PlanFormatter for TemplateFormatter {
    fn format(&self, plan: &Plan) -> Result<Vec<PlanFile>, MigrateError> {
        Ok(self
            .parts
            .iter()
            .map(|(name, body)| PlanFile {
                name: name(plan),
                content: body(plan).into_bytes(),
            })
            .collect())
    }
}

impl std::fmt::Debug for TemplateFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateFormatter")
            .field("parts", &self.parts.len())
            .finish()
    }
}

/// Binds a driver, a directory and a formatter to produce and persist
/// plans.
pub struct Planner<D, T> {
    drv: D,
    dir: T,
    fmt: Box<dyn PlanFormatter + Send + Sync>,
    checksum: bool,
}

impl<D: Driver, T: Dir> Planner<D, T> {
    /// Create a planner with the default formatter and checksum
    /// maintenance enabled.
    pub fn new(drv: D, dir: T) -> Self {
        Self {
            drv,
            dir,
            fmt: Box::new(DefaultFormatter),
            checksum: true,
        }
    }

    /// Replace the formatter.
    pub fn with_formatter(mut self, fmt: impl PlanFormatter + Send + Sync + 'static) -> Self {
        self.fmt = Box::new(fmt);
        self
    }

    /// Skip rewriting the sum file after [`Planner::write_plan`].
    pub fn disable_checksum(mut self) -> Self {
        self.checksum = false;
        self
    }

    /// Plan the changes turning the connected database into `desired`.
    /// Fails with [`MigrateError::NoPlan`] when there is nothing to do.
    /// The token is checked before each driver call and forwarded into it.
    pub fn plan(
        &self,
        cancel: &CancelToken,
        name: &str,
        desired: &Realm,
    ) -> Result<Plan, MigrateError> {
        cancel.check()?;
        let current = self.drv.inspect_realm(cancel)?;
        let changes = self.drv.realm_diff(&current, desired)?;
        if changes.is_empty() {
            return Err(MigrateError::NoPlan);
        }
        cancel.check()?;
        self.drv.plan_changes(cancel, name, &changes)
    }

    /// Write the plan's files into the directory and refresh the sum file.
    pub fn write_plan(&self, plan: &Plan) -> Result<(), MigrateError> {
        for file in self.fmt.format(plan)? {
            self.dir.write_file(&file.name, &file.content)?;
        }
        if self.checksum {
            hash::write_sum_file(&self.dir)?;
        }
        Ok(())
    }
}
