//! Execution facade: reads, writes, and DDL against registered backends.
//!
//! Every public operation opens one connection scope and closes it before
//! returning. Read paths and DDL scripts surface backend failures as
//! [`OrmError::Backend`]; write paths fold them into a failed [`CrudReturn`].

mod options;


pub use options::{DeleteOptions, SaveOptions};

use crate::{
    DEFAULT_BACKEND,
    backend::{Backend, BackendRegistry, ConnectionScope, Dialect},
    catalog,
    error::{BackendExecutionError, OrmError, SchemaError},
    hooks::{LifecycleObserver, RecordChange},
    materialize::{coercion_error, materialize},
    model::{TableDefinition, field::FieldWriteError},
    obs::sink::{MetricsEvent, MetricsSink, OpKind, Span, record, with_metrics_sink},
    query::{CompiledPredicate, Expr, Predicate, PredicateCompiler},
    response::CrudReturn,
    statement::{DboCommand, StatementBuilder, StatementKind, ddl_matches, statement_trace},
    traits::Entity,
    value::Value,
};
use std::sync::Arc;

// Operations not bound to an entity report under this name.
const RAW_STATEMENT: &str = "<statement>";

///
/// DbSession
///
/// Session-scoped handle over a backend registry with policy (debug, metrics).
///

pub struct DbSession {
    backends: BackendRegistry,
    debug: bool,
    metrics: Option<&'static dyn MetricsSink>,
}

impl DbSession {
    #[must_use]
    pub const fn new(backends: BackendRegistry) -> Self {
        Self {
            backends,
            debug: false,
            metrics: None,
        }
    }

    /// Log every statement with its bound values inlined.
    #[must_use]
    pub const fn debug(mut self) -> Self {
        self.debug = true;
        self
    }

    #[must_use]
    pub const fn metrics_sink(mut self, sink: &'static dyn MetricsSink) -> Self {
        self.metrics = Some(sink);
        self
    }

    #[must_use]
    pub const fn backends(&self) -> &BackendRegistry {
        &self.backends
    }

    fn with_metrics<T>(&self, f: impl FnOnce() -> T) -> T {
        if let Some(sink) = self.metrics {
            with_metrics_sink(sink, f)
        } else {
            f()
        }
    }

    fn target<E: Entity>(&self) -> Result<Target, SchemaError> {
        let table = catalog::table_definition::<E>();
        let backend = self.backends.try_get(table.backend())?;
        let dialect = backend.dialect();

        Ok(Target {
            table,
            backend,
            dialect,
        })
    }

    fn announce(
        &self,
        entity: &'static str,
        dialect: &Dialect,
        kind: StatementKind,
        command: &DboCommand,
    ) {
        if self.debug {
            tracing::info!(
                entity,
                statement = %kind,
                sql = %statement_trace(command, dialect),
                "executing statement"
            );
        } else {
            tracing::debug!(entity, statement = %kind, sql = command.text(), "executing statement");
        }

        record(MetricsEvent::Statement { kind, entity });
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    /// Load every object matching `predicate`, associations included.
    pub fn query<E: Entity>(&self, predicate: Option<&Predicate<E>>) -> Result<Vec<E>, OrmError> {
        self.with_metrics(|| self.query_inner(predicate.map(Predicate::expr)))
    }

    /// First object matching `predicate`, in backend row order.
    pub fn load<E: Entity>(&self, predicate: &Predicate<E>) -> Result<Option<E>, OrmError> {
        let objects = self.query(Some(predicate))?;

        Ok(objects.into_iter().next())
    }

    /// Run caller-supplied SQL and materialize the result as `E`.
    ///
    /// Parameter names may carry the dialect's prefix or not.
    pub fn query_sql<E: Entity>(
        &self,
        sql: &str,
        parameters: &[(&str, Value)],
    ) -> Result<Vec<E>, OrmError> {
        self.with_metrics(|| {
            let target = self.target::<E>()?;
            let command = parameters.iter().fold(
                target.command(sql),
                |command, (name, value)| {
                    let name = name.trim_start_matches(target.dialect.parameter_prefix);
                    command.with_parameter(name, value.clone())
                },
            );

            self.read(&target, StatementKind::Select, &command)
        })
    }

    /// Fresh copy of `entity` from the backend, or `None` when its row is gone.
    pub fn reload<E: Entity>(&self, entity: &E) -> Result<Option<E>, OrmError> {
        self.with_metrics(|| {
            let target = self.target::<E>()?;
            let command = target
                .command(target.builder().reload()?)
                .with_row(target.table.to_row(entity)?);
            let objects: Vec<E> = self.read(&target, StatementKind::SelectReload, &command)?;

            Ok(objects.into_iter().next())
        })
    }

    /// True when at least one row matches `predicate`.
    pub fn exists<E: Entity>(&self, predicate: &Predicate<E>) -> Result<bool, OrmError> {
        self.with_metrics(|| {
            let target = self.target::<E>()?;
            let builder = target.builder();
            let compiled = target.compile(predicate.expr(), Some(builder.root_alias()))?;
            let command = target
                .command(builder.count(Some(&compiled))?)
                .with_predicate(&compiled);

            self.count(&target, &command)
        })
    }

    /// True when a row with the entity's primary key exists.
    pub fn exists_entity<E: Entity>(&self, entity: &E) -> Result<bool, OrmError> {
        self.with_metrics(|| {
            let target = self.target::<E>()?;
            let command = target
                .command(target.builder().existence_check()?)
                .with_row(target.table.to_row(entity)?);

            self.count(&target, &command)
        })
    }

    pub fn table_exists<E: Entity>(&self) -> Result<bool, OrmError> {
        self.with_metrics(|| {
            let target = self.target::<E>()?;
            let _span = Span::new(OpKind::Exists, target.entity());
            let mut scope = target.acquire()?;

            Ok(scope
                .table_exists(target.table.table_name())
                .map_err(|err| err.with_context(format!("table exists {}", target.table.name())))?)
        })
    }

    fn query_inner<E: Entity>(&self, predicate: Option<&Expr>) -> Result<Vec<E>, OrmError> {
        let target = self.target::<E>()?;
        let builder = target.builder();
        let compiled = predicate
            .map(|expr| target.compile(expr, Some(builder.root_alias())))
            .transpose()?;

        let mut command = target.command(builder.select_where(compiled.as_ref())?);
        if let Some(compiled) = &compiled {
            command = command.with_predicate(compiled);
        }

        self.read(&target, StatementKind::Select, &command)
    }

    fn read<E: Entity>(
        &self,
        target: &Target,
        kind: StatementKind,
        command: &DboCommand,
    ) -> Result<Vec<E>, OrmError> {
        let entity = target.entity();
        let mut span = Span::new(OpKind::Load, entity);

        let rows = {
            let mut scope = target.acquire()?;
            self.announce(entity, &target.dialect, kind, command);
            scope
                .execute_reader(command)
                .map_err(target.failed(kind))?
        };

        let objects = materialize::<E>(&rows)?;
        record(MetricsEvent::RowsMaterialized {
            entity,
            rows_read: to_u64(rows.len()),
            objects: to_u64(objects.len()),
        });
        span.set_rows(to_u64(objects.len()));

        Ok(objects)
    }

    fn count(&self, target: &Target, command: &DboCommand) -> Result<bool, OrmError> {
        let _span = Span::new(OpKind::Exists, target.entity());
        let mut scope = target.acquire()?;
        self.announce(
            target.entity(),
            &target.dialect,
            StatementKind::ExistenceCheck,
            command,
        );

        let value = scope
            .execute_scalar(command)
            .map_err(target.failed(StatementKind::ExistenceCheck))?;

        Ok(value.as_count().unwrap_or(0) > 0)
    }

    // ---------------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------------

    /// Insert when the key is new, update otherwise.
    ///
    /// The existence check keys on the entity's primary key. With an identity
    /// field the generated value is written back into `entity`; without one,
    /// [`Entity::assign_keys`] runs before the insert.
    pub fn save_changes<E: Entity>(
        &self,
        entity: &mut E,
        options: &SaveOptions<'_, E>,
    ) -> Result<CrudReturn<E>, OrmError> {
        self.with_metrics(|| self.write(entity, options, WriteMode::Save))
    }

    /// Insert without an existence check.
    pub fn insert<E: Entity>(
        &self,
        entity: &mut E,
        options: &SaveOptions<'_, E>,
    ) -> Result<CrudReturn<E>, OrmError> {
        self.with_metrics(|| self.write(entity, options, WriteMode::Insert))
    }

    /// Update by primary key. Matching no row is a success with zero rows.
    pub fn update<E: Entity>(
        &self,
        entity: &mut E,
        options: &SaveOptions<'_, E>,
    ) -> Result<CrudReturn<E>, OrmError> {
        self.with_metrics(|| self.write(entity, options, WriteMode::Update))
    }

    /// Delete by primary key.
    pub fn delete<E: Entity>(
        &self,
        entity: &E,
        options: &DeleteOptions<'_, E>,
    ) -> Result<CrudReturn<E>, OrmError> {
        self.with_metrics(|| {
            let target = self.target::<E>()?;
            let mut span = Span::new(OpKind::Delete, target.entity());
            let command = target
                .command(target.builder().delete()?)
                .with_row(target.table.to_row(entity)?);

            if options.fire_before {
                notify(options.observer, |o| {
                    o.before_delete(entity, RecordChange::pending_delete());
                });
            }

            let result = self.execute_write(&target, StatementKind::Delete, &command);
            let outcome = self.capture(&target, StatementKind::Delete, result, |message| {
                notify(options.observer, |o| {
                    o.operation_failed(entity, StatementKind::Delete, message);
                });
            })?;
            span.set_rows(rows_of(&outcome));

            if outcome.is_ok() && options.fire_after {
                notify(options.observer, |o| {
                    o.after_delete(entity, change_of(&outcome));
                });
            }

            Ok(outcome)
        })
    }

    /// Delete every row matching `predicate`; `None` deletes all rows.
    pub fn delete_all<E: Entity>(
        &self,
        predicate: Option<&Predicate<E>>,
    ) -> Result<CrudReturn<E>, OrmError> {
        self.with_metrics(|| {
            let target = self.target::<E>()?;
            let mut span = Span::new(OpKind::Delete, target.entity());

            // delete statements carry no table alias
            let compiled = predicate
                .map(|p| target.compile(p.expr(), None))
                .transpose()?;
            let mut command = target.command(target.builder().delete_all(compiled.as_ref()));
            if let Some(compiled) = &compiled {
                command = command.with_predicate(compiled);
            }

            let result = self.execute_write(&target, StatementKind::DeleteAll, &command);
            let outcome = self.capture(&target, StatementKind::DeleteAll, result, |_| {})?;
            span.set_rows(rows_of(&outcome));

            Ok(outcome)
        })
    }

    fn write<E: Entity>(
        &self,
        entity: &mut E,
        options: &SaveOptions<'_, E>,
        mode: WriteMode,
    ) -> Result<CrudReturn<E>, OrmError> {
        let target = self.target::<E>()?;
        let mut span = Span::new(OpKind::Save, target.entity());

        if options.validate
            && let Some(rejected) = self.check_rules(&target, entity, options.observer)?
        {
            return Ok(rejected);
        }

        if options.fire.before() {
            notify(options.observer, |o| {
                o.before_save(entity, RecordChange::pending_save());
            });
        }

        let mut change = mode.initial_kind();
        let result = self.write_on(&target, entity, options, mode, &mut change);
        let outcome = self.capture(&target, change, result, |message| {
            notify(options.observer, |o| o.operation_failed(entity, change, message));
        })?;
        span.set_rows(rows_of(&outcome));

        if outcome.is_ok() && options.fire.after() {
            notify(options.observer, |o| o.after_save(entity, change_of(&outcome)));
        }

        if outcome.is_ok() {
            return Ok(outcome.with_data(entity.clone()));
        }

        Ok(outcome)
    }

    fn write_on<E: Entity>(
        &self,
        target: &Target,
        entity: &mut E,
        options: &SaveOptions<'_, E>,
        mode: WriteMode,
        change: &mut StatementKind,
    ) -> Result<CrudReturn<E>, OrmError> {
        let builder = target.builder();
        let check = match mode {
            WriteMode::Save => Some(
                target
                    .command(builder.existence_check()?)
                    .with_row(target.table.to_row(entity)?),
            ),
            WriteMode::Insert | WriteMode::Update => None,
        };

        let mut scope = target.acquire()?;

        let exists = match (&check, mode) {
            (Some(check), _) => {
                *change = StatementKind::ExistenceCheck;
                self.announce(
                    target.entity(),
                    &target.dialect,
                    StatementKind::ExistenceCheck,
                    check,
                );
                let found = scope
                    .execute_scalar(check)
                    .map_err(target.failed(StatementKind::ExistenceCheck))?;
                found.as_count().unwrap_or(0) > 0
            }
            (None, WriteMode::Update) => true,
            (None, _) => false,
        };

        if !exists {
            *change = StatementKind::Insert;
            let affected = self.insert_on(target, &mut scope, entity, options.ignore_automatic)?;
            return Ok(CrudReturn::ok(StatementKind::Insert, affected));
        }

        if options.do_not_update_when_exists && mode == WriteMode::Save {
            return Ok(CrudReturn::ok(StatementKind::None, -1));
        }

        *change = StatementKind::Update;
        let command = target
            .command(builder.update()?)
            .with_row(target.table.to_row(entity)?);
        self.announce(target.entity(), &target.dialect, StatementKind::Update, &command);
        let affected = scope
            .execute(&command)
            .map_err(target.failed(StatementKind::Update))?;

        Ok(CrudReturn::ok(StatementKind::Update, affected))
    }

    // Identity inserts read the generated key back on the same connection
    // and write it into the entity.
    fn insert_on<E: Entity>(
        &self,
        target: &Target,
        scope: &mut ConnectionScope,
        entity: &mut E,
        ignore_automatic: bool,
    ) -> Result<i64, OrmError> {
        let table = &target.table;
        if table.identity_field().is_none() {
            entity.assign_keys();
        }

        let command = target
            .command(target.builder().insert(ignore_automatic))
            .with_row(table.to_row(entity)?);
        self.announce(target.entity(), &target.dialect, StatementKind::Insert, &command);

        let identity = table.identity_field().filter(|_| ignore_automatic);
        let (Some(field), Some(last_identity)) = (identity, target.dialect.last_identity) else {
            return Ok(scope
                .execute(&command)
                .map_err(target.failed(StatementKind::Insert))?);
        };

        let generated = scope
            .insert_returning_identity(&command, last_identity)
            .map_err(target.failed(StatementKind::Insert))?;
        if !generated.is_null() {
            match field.write(entity, generated.clone()) {
                Ok(()) => {}
                Err(FieldWriteError::ForeignType) => {
                    return Err(field.mismatch(table.entity_name()).into());
                }
                Err(FieldWriteError::Coercion(source)) => {
                    return Err(coercion_error(table, field, &generated, source).into());
                }
            }
        }

        Ok(1)
    }

    fn execute_write<E>(
        &self,
        target: &Target,
        kind: StatementKind,
        command: &DboCommand,
    ) -> Result<CrudReturn<E>, OrmError> {
        let mut scope = target.acquire()?;
        self.announce(target.entity(), &target.dialect, kind, command);
        let affected = scope.execute(command).map_err(target.failed(kind))?;

        Ok(CrudReturn::ok(kind, affected))
    }

    fn check_rules<E: Entity>(
        &self,
        target: &Target,
        entity: &E,
        observer: Option<&dyn LifecycleObserver<E>>,
    ) -> Result<Option<CrudReturn<E>>, OrmError> {
        let failures = target.table.validate(entity)?;
        if failures.is_empty() {
            return Ok(None);
        }

        let message = failures
            .iter()
            .map(|f| f.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        tracing::debug!(entity = target.entity(), %message, "validation rejected save");
        record(MetricsEvent::ValidationFailed {
            entity: target.entity(),
        });
        notify(observer, |o| o.validation_failed(entity, &failures));

        Ok(Some(CrudReturn::fail(StatementKind::None, message)))
    }

    // Backend failures become a failed outcome; everything else propagates.
    fn capture<T>(
        &self,
        target: &Target,
        change: StatementKind,
        result: Result<CrudReturn<T>, OrmError>,
        on_fail: impl FnOnce(&str),
    ) -> Result<CrudReturn<T>, OrmError> {
        match result {
            Err(OrmError::Backend(err)) => {
                let message = err.to_string();
                tracing::warn!(
                    entity = target.entity(),
                    statement = %change,
                    error = %message,
                    "write failed"
                );
                record(MetricsEvent::WriteFailed {
                    entity: target.entity(),
                });
                on_fail(&message);

                Ok(CrudReturn::fail(change, message))
            }
            other => other,
        }
    }

    // ---------------------------------------------------------------------
    // Statements and DDL
    // ---------------------------------------------------------------------

    /// Run raw SQL on the default backend.
    pub fn execute_statement(&self, sql: &str) -> Result<CrudReturn<()>, OrmError> {
        self.execute_statement_on(DEFAULT_BACKEND, sql)
    }

    /// Run raw SQL on a named backend. Unknown backends are an error;
    /// backend failures are a failed outcome.
    pub fn execute_statement_on(
        &self,
        backend: &str,
        sql: &str,
    ) -> Result<CrudReturn<()>, OrmError> {
        self.raw_on(backend, |_| sql.to_string())
    }

    /// Rename a table on the default backend.
    pub fn rename_table(&self, from: &str, to: &str) -> Result<CrudReturn<()>, OrmError> {
        self.rename_table_on(DEFAULT_BACKEND, from, to)
    }

    /// Rename a table on a named backend, in that backend's dialect.
    pub fn rename_table_on(
        &self,
        backend: &str,
        from: &str,
        to: &str,
    ) -> Result<CrudReturn<()>, OrmError> {
        self.raw_on(backend, |dialect| dialect.rename_table(from, to))
    }

    fn raw_on(
        &self,
        backend: &str,
        render: impl FnOnce(&Dialect) -> String,
    ) -> Result<CrudReturn<()>, OrmError> {
        self.with_metrics(|| {
            let handle = self.backends.try_get(backend)?;
            let dialect = handle.dialect();
            let _span = Span::new(OpKind::Statement, RAW_STATEMENT);
            let command = DboCommand::new("", render(&dialect));

            let result = ConnectionScope::acquire(backend, handle.as_ref()).and_then(|mut scope| {
                self.announce(
                    RAW_STATEMENT,
                    &dialect,
                    StatementKind::UnknownStatement,
                    &command,
                );
                scope.execute(&command)
            });

            match result {
                Ok(affected) => Ok(CrudReturn::ok(StatementKind::UnknownStatement, affected)),
                Err(err) => {
                    let message = err.to_string();
                    tracing::warn!(backend, error = %message, "statement failed");
                    record(MetricsEvent::WriteFailed {
                        entity: RAW_STATEMENT,
                    });

                    Ok(CrudReturn::fail(StatementKind::UnknownStatement, message))
                }
            }
        })
    }

    pub fn create_table<E: Entity>(&self) -> Result<CrudReturn<()>, OrmError> {
        self.with_metrics(|| {
            let target = self.target::<E>()?;
            let sql = target.builder().create_table();

            self.run_ddl(&target, &[(StatementKind::CreateTable, sql)])
        })
    }

    pub fn drop_table<E: Entity>(&self) -> Result<CrudReturn<()>, OrmError> {
        self.with_metrics(|| {
            let target = self.target::<E>()?;
            let sql = target.builder().drop_table();

            self.run_ddl(&target, &[(StatementKind::DropTable, sql)])
        })
    }

    /// Empty the table. With `use_drop_and_create` the table is dropped and
    /// recreated from metadata, which also resets identity counters.
    pub fn truncate<E: Entity>(&self, use_drop_and_create: bool) -> Result<CrudReturn<()>, OrmError> {
        self.with_metrics(|| {
            let target = self.target::<E>()?;
            let builder = target.builder();
            let statements = if use_drop_and_create {
                vec![
                    (StatementKind::DropTable, builder.drop_table()),
                    (StatementKind::CreateTable, builder.create_table()),
                ]
            } else {
                vec![(StatementKind::DeleteAll, builder.truncate())]
            };

            self.run_ddl(&target, &statements)
        })
    }

    /// Rebuild the table from current metadata, keeping its rows.
    ///
    /// Rows are read back with `select *`, the table is dropped and created,
    /// and every row is re-inserted with its stored keys. Columns that no
    /// longer exist are discarded; new columns take their type's default.
    /// A missing table is simply created. Returns the number of rows restored.
    pub fn alter_table<E: Entity>(&self) -> Result<usize, OrmError> {
        self.with_metrics(|| self.alter_table_inner::<E>())
    }

    fn alter_table_inner<E: Entity>(&self) -> Result<usize, OrmError> {
        let target = self.target::<E>()?;
        let mut span = Span::new(OpKind::Ddl, target.entity());
        let builder = target.builder();
        let mut scope = target.acquire()?;

        let backup_command = target.command(format!("select * from {}", target.table.name()));
        self.announce(
            target.entity(),
            &target.dialect,
            StatementKind::Select,
            &backup_command,
        );
        let (backup, existed) = match scope.execute_reader(&backup_command) {
            Ok(rows) => (materialize::<E>(&rows)?, true),
            Err(err) if is_missing_table(&err) => (Vec::new(), false),
            Err(err) => return Err(target.failed(StatementKind::Select)(err).into()),
        };

        let mut statements = Vec::new();
        if existed {
            statements.push((StatementKind::DropTable, builder.drop_table()));
        }
        statements.push((StatementKind::CreateTable, builder.create_table()));
        for (kind, sql) in statements {
            let command = target.command(sql);
            self.announce(target.entity(), &target.dialect, kind, &command);
            scope.execute(&command).map_err(target.failed(kind))?;
        }

        let restored = backup.len();
        for mut entity in backup {
            self.insert_on(&target, &mut scope, &mut entity, false)?;
        }
        tracing::info!(entity = target.entity(), restored, "table rebuilt");
        span.set_rows(to_u64(restored));

        Ok(restored)
    }

    fn run_ddl(
        &self,
        target: &Target,
        statements: &[(StatementKind, String)],
    ) -> Result<CrudReturn<()>, OrmError> {
        let _span = Span::new(OpKind::Ddl, target.entity());
        let mut last = StatementKind::None;
        let result = self.ddl_on(target, statements, &mut last);

        self.capture(target, last, result, |_| {})
    }

    fn ddl_on(
        &self,
        target: &Target,
        statements: &[(StatementKind, String)],
        last: &mut StatementKind,
    ) -> Result<CrudReturn<()>, OrmError> {
        let mut scope = target.acquire()?;
        let mut affected = 0;
        for (kind, sql) in statements {
            *last = *kind;
            let command = target.command(sql.as_str());
            self.announce(target.entity(), &target.dialect, *kind, &command);
            affected = scope.execute(&command).map_err(target.failed(*kind))?;
        }

        Ok(CrudReturn::ok(*last, affected))
    }

    // ---------------------------------------------------------------------
    // Scripts
    // ---------------------------------------------------------------------

    /// Create-table script for `E` under its backend's dialect.
    pub fn script_create_table<E: Entity>(&self) -> Result<String, OrmError> {
        let target = self.target::<E>()?;

        Ok(target.builder().create_table())
    }

    pub fn script_drop_table<E: Entity>(&self) -> Result<String, OrmError> {
        let target = self.target::<E>()?;

        Ok(target.builder().drop_table())
    }

    /// True when a previously saved create script still matches metadata.
    pub fn create_script_matches<E: Entity>(&self, saved: &str) -> Result<bool, OrmError> {
        let script = self.script_create_table::<E>()?;

        Ok(ddl_matches(saved, &script))
    }

    /// Render the statement `kind` would run, bound values inlined.
    ///
    /// `entity` supplies key and column values; `predicate` applies to
    /// selects, counts, and bulk deletes. `None` for kinds without a
    /// generated form.
    pub fn statement_trace<E: Entity>(
        &self,
        kind: StatementKind,
        predicate: Option<&Predicate<E>>,
        entity: Option<&E>,
    ) -> Result<Option<String>, OrmError> {
        let target = self.target::<E>()?;
        let builder = target.builder();
        let alias = (kind != StatementKind::DeleteAll).then(|| builder.root_alias());
        let compiled: Option<CompiledPredicate> = predicate
            .map(|p| target.compile(p.expr(), alias))
            .transpose()?;

        let Some(sql) = builder.render(kind, compiled.as_ref())? else {
            return Ok(None);
        };

        let mut command = target.command(sql);
        if let Some(compiled) = &compiled {
            command = command.with_predicate(compiled);
        }
        if let Some(entity) = entity {
            command = command.with_row(target.table.to_row(entity)?);
        }

        Ok(Some(statement_trace(&command, &target.dialect)))
    }
}

///
/// Target
///
/// Table metadata resolved to its backend for one operation.
///

struct Target {
    table: Arc<TableDefinition>,
    backend: Arc<dyn Backend>,
    dialect: Dialect,
}

impl Target {
    fn entity(&self) -> &'static str {
        self.table.entity_name()
    }

    fn builder(&self) -> StatementBuilder<'_> {
        StatementBuilder::new(&self.table, self.dialect)
    }

    fn command(&self, text: impl Into<String>) -> DboCommand {
        DboCommand::new(self.table.table_name(), text)
    }

    fn compile(&self, expr: &Expr, root_alias: Option<&str>) -> Result<CompiledPredicate, OrmError> {
        PredicateCompiler::new(&self.table, self.dialect).compile(expr, "", root_alias)
    }

    fn acquire(&self) -> Result<ConnectionScope, BackendExecutionError> {
        ConnectionScope::acquire(self.table.backend(), self.backend.as_ref())
    }

    fn failed(
        &self,
        kind: StatementKind,
    ) -> impl Fn(BackendExecutionError) -> BackendExecutionError + '_ {
        move |err| err.with_context(format!("{kind} {}", self.table.name()))
    }
}

///
/// WriteMode
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum WriteMode {
    Save,
    Insert,
    Update,
}

impl WriteMode {
    const fn initial_kind(self) -> StatementKind {
        match self {
            Self::Save => StatementKind::ExistenceCheck,
            Self::Insert => StatementKind::Insert,
            Self::Update => StatementKind::Update,
        }
    }
}

fn notify<E>(
    observer: Option<&dyn LifecycleObserver<E>>,
    f: impl FnOnce(&dyn LifecycleObserver<E>),
) {
    if let Some(observer) = observer {
        f(observer);
    }
}

fn change_of<E>(outcome: &CrudReturn<E>) -> RecordChange {
    RecordChange::new(outcome.records_affected, outcome.change_type)
}

fn rows_of<E>(outcome: &CrudReturn<E>) -> u64 {
    u64::try_from(outcome.records_affected).unwrap_or(0)
}

fn to_u64(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

fn is_missing_table(err: &BackendExecutionError) -> bool {
    err.message.to_ascii_lowercase().contains("no such table")
}
