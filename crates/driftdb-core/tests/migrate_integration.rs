//! End-to-end tests for the migration pipeline: diff, plan, directory,
//! executor and the sled-backed revision store.

use driftdb_core::diff::Differ;
use driftdb_core::driver::{CancelToken, Driver, LockGuard, Locker, RestoreFunc};
use driftdb_core::migrate::{
    validate, write_sum_file, Dir, Executor, LocalDir, MigrateError, Plan, PlanChange, Planner,
    RevisionReadWriter, RevisionStore,
};
use driftdb_core::schema::{Change, Column, Realm, Schema, Table};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// A driver over an in-memory realm: executing `CREATE TABLE t ...`
/// appends a table to the first schema, everything else is recorded
/// verbatim.
#[derive(Default)]
struct FakeDriver {
    realm: Arc<Mutex<Realm>>,
    executed: Mutex<Vec<String>>,
    locks: Mutex<HashSet<String>>,
    fail_on: Mutex<Option<String>>,
}

impl FakeDriver {
    fn with_realm(realm: Realm) -> Self {
        Self {
            realm: Arc::new(Mutex::new(realm)),
            ..Default::default()
        }
    }

    fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }
}

impl Driver for FakeDriver {
    fn inspect_realm(&self, _cancel: &CancelToken) -> Result<Realm, MigrateError> {
        Ok(self.realm.lock().clone())
    }

    fn realm_diff(&self, from: &Realm, to: &Realm) -> Result<Vec<Change>, MigrateError> {
        Differ::new()
            .realm_diff(from, to)
            .map_err(|e| MigrateError::Driver(e.to_string()))
    }

    fn plan_changes(
        &self,
        _cancel: &CancelToken,
        name: &str,
        changes: &[Change],
    ) -> Result<Plan, MigrateError> {
        let mut plan = Plan::new(name);
        for change in flatten(changes) {
            if let Change::AddTable(t) = change {
                let columns: Vec<_> = t
                    .columns
                    .iter()
                    .map(|c| format!("{} {}", c.name, c.column_type.raw))
                    .collect();
                plan = plan.with_change(
                    PlanChange::new(format!("CREATE TABLE {}({})", t.name, columns.join(", ")))
                        .with_reverse(format!("DROP TABLE {}", t.name)),
                );
            }
        }
        Ok(plan)
    }

    fn apply_changes(&self, _cancel: &CancelToken, _changes: &[Change]) -> Result<(), MigrateError> {
        Ok(())
    }

    fn exec(&self, _cancel: &CancelToken, stmt: &str) -> Result<(), MigrateError> {
        if self.fail_on.lock().as_deref() == Some(stmt) {
            return Err(MigrateError::Driver(format!("cannot run {stmt:?}")));
        }
        self.executed.lock().push(stmt.to_string());
        if let Some(name) = stmt
            .strip_prefix("CREATE TABLE ")
            .and_then(|rest| rest.split(['(', ';', ' ']).next())
        {
            let mut realm = self.realm.lock();
            if let Some(schema) = realm.schemas.first_mut() {
                schema.tables.push(Table::new(name));
            }
        }
        Ok(())
    }

    fn snapshot(&self, _cancel: &CancelToken) -> Result<RestoreFunc, MigrateError> {
        let realm = self.realm.lock();
        if realm.schemas.iter().any(|s| !s.tables.is_empty()) {
            return Err(driftdb_core::migrate::NotCleanError {
                reason: "found tables".into(),
            }
            .into());
        }
        let saved = realm.clone();
        let shared = Arc::clone(&self.realm);
        Ok(Box::new(move |_cancel: &CancelToken| {
            *shared.lock() = saved;
            Ok(())
        }))
    }

    fn locker(&self) -> Option<&dyn Locker> {
        Some(self)
    }
}

impl Locker for FakeDriver {
    fn lock(
        &self,
        cancel: &CancelToken,
        name: &str,
        _timeout: Duration,
    ) -> Result<LockGuard<'_>, MigrateError> {
        cancel.check()?;
        let mut locks = self.locks.lock();
        if !locks.insert(name.to_string()) {
            return Err(MigrateError::Driver("already locked".into()));
        }
        let name = name.to_string();
        Ok(LockGuard::new(move || {
            self.locks.lock().remove(&name);
        }))
    }
}

fn flatten(changes: &[Change]) -> Vec<&Change> {
    let mut out = Vec::new();
    for change in changes {
        match change {
            Change::ModifySchema { changes, .. } | Change::ModifyTable { changes, .. } => {
                out.extend(flatten(changes))
            }
            other => out.push(other),
        }
    }
    out
}

struct TestContext {
    _dir_tmp: tempfile::TempDir,
    dir: LocalDir,
    drv: Arc<FakeDriver>,
    _revision_db: sled::Db,
    revisions: Arc<RevisionStore>,
    cancel: CancelToken,
}

impl TestContext {
    fn new() -> Self {
        let dir_tmp = tempfile::tempdir().unwrap();
        let dir = LocalDir::new(dir_tmp.path()).unwrap();
        let drv = Arc::new(FakeDriver::with_realm(
            Realm::new().with_schema(Schema::new("app")),
        ));
        let revision_db = sled::Config::new().temporary(true).open().unwrap();
        let revisions = Arc::new(RevisionStore::open(&revision_db).unwrap());
        Self {
            _dir_tmp: dir_tmp,
            dir,
            drv,
            _revision_db: revision_db,
            revisions,
            cancel: CancelToken::new(),
        }
    }

    fn executor(&self) -> Executor {
        Executor::builder()
            .driver(Arc::clone(&self.drv))
            .dir(self.dir.clone())
            .revisions(Arc::clone(&self.revisions))
            .build()
            .unwrap()
    }
}

fn desired_state() -> Realm {
    Realm::new().with_schema(
        Schema::new("app")
            .with_table(
                Table::new("users")
                    .with_column(Column::int("id", "int"))
                    .with_primary_key(["id"]),
            )
            .with_table(Table::new("pets").with_column(Column::int("id", "int"))),
    )
}

#[test]
fn test_plan_write_execute_cycle() {
    let ctx = TestContext::new();

    // Plan the difference between the connected (empty) realm and the
    // desired state.
    let planner = Planner::new(Arc::clone(&ctx.drv), ctx.dir.clone());
    let plan = planner.plan(&ctx.cancel, "add_tables", &desired_state()).unwrap();
    assert_eq!(plan.changes.len(), 2);
    assert_eq!(plan.changes[0].cmd, "CREATE TABLE users(id int)");

    // Write it into the directory; the sum file is maintained.
    planner.write_plan(&plan).unwrap();
    assert!(validate(&ctx.dir).is_ok());
    let files = ctx.dir.files().unwrap();
    assert_eq!(files.len(), 1);
    assert!(files[0].name().ends_with("_add_tables.sql"));

    // Apply it.
    ctx.executor().execute_n(&ctx.cancel, 0).unwrap();
    assert_eq!(
        ctx.drv.executed(),
        vec!["CREATE TABLE users(id int);", "CREATE TABLE pets(id int);"]
    );
    let revs = ctx.revisions.read_revisions().unwrap();
    assert_eq!(revs.len(), 1);
    assert!(revs[0].is_complete());
    assert_eq!(revs[0].total, 2);

    // The desired state is now reached and nothing is pending.
    assert!(matches!(
        ctx.executor().execute_n(&ctx.cancel, 0),
        Err(MigrateError::NoPendingFiles)
    ));
    assert!(matches!(
        planner.plan(&ctx.cancel, "noop", &ctx.drv.inspect_realm(&ctx.cancel).unwrap()),
        Err(MigrateError::NoPlan)
    ));
}

#[test]
fn test_resume_across_executor_instances() {
    let ctx = TestContext::new();
    ctx.dir
        .write_file("1_users.sql", b"CREATE TABLE users(id int);\n")
        .unwrap();
    ctx.dir
        .write_file(
            "2_pets.sql",
            b"CREATE TABLE pets(id int);\nCREATE TABLE toys(id int);\n",
        )
        .unwrap();
    write_sum_file(&ctx.dir).unwrap();

    *ctx.drv.fail_on.lock() = Some("CREATE TABLE toys(id int);".into());
    assert!(ctx.executor().execute_n(&ctx.cancel, 0).is_err());

    let revs = ctx.revisions.read_revisions().unwrap();
    assert_eq!(revs.len(), 2);
    assert_eq!(revs[1].applied, 1);
    assert_eq!(revs[1].total, 2);
    assert!(revs[1].error.contains("CREATE TABLE toys(id int);"));

    // A fresh executor over the same store resumes at the failed
    // statement.
    *ctx.drv.fail_on.lock() = None;
    ctx.executor().execute_n(&ctx.cancel, 0).unwrap();
    assert_eq!(
        ctx.drv.executed().last().unwrap(),
        "CREATE TABLE toys(id int);"
    );
    let revs = ctx.revisions.read_revisions().unwrap();
    assert!(revs.iter().all(|r| r.is_complete()));
}

#[test]
fn test_read_state_materializes_directory() {
    let ctx = TestContext::new();
    ctx.dir
        .write_file("1_users.sql", b"CREATE TABLE users(id int);\n")
        .unwrap();
    ctx.dir
        .write_file("2_pets.sql", b"CREATE TABLE pets(id int);\n")
        .unwrap();
    write_sum_file(&ctx.dir).unwrap();

    let realm = ctx.executor().read_state(&ctx.cancel).unwrap();
    let schema = realm.schema("app").unwrap();
    assert!(schema.table("users").is_some());
    assert!(schema.table("pets").is_some());

    // The scratch work was rolled back.
    assert!(ctx
        .drv
        .inspect_realm(&ctx.cancel)
        .unwrap()
        .schema("app")
        .unwrap()
        .tables
        .is_empty());
}
