use crate::{
    COUNT_ALIAS,
    backend::{DatabaseType, Dialect},
    error::SchemaError,
    model::{AutomaticValue, FieldDefinition, TableDefinition},
    query::CompiledPredicate,
    statement::StatementKind,
    value::ValueType,
};
use std::{any::TypeId, sync::Arc};

///
/// StatementBuilder
///
/// Renders full statements for one table under one dialect.
/// Output is a pure function of its inputs.
///

pub struct StatementBuilder<'a> {
    table: &'a TableDefinition,
    dialect: Dialect,
}

impl<'a> StatementBuilder<'a> {
    #[must_use]
    pub const fn new(table: &'a TableDefinition, dialect: Dialect) -> Self {
        Self { table, dialect }
    }

    /// Alias of the root table in multi-table statements.
    #[must_use]
    pub const fn root_alias(&self) -> &'static str {
        self.table.table_name()
    }

    fn from_clause(&self) -> String {
        let name = self.table.name();
        if name == self.root_alias() {
            name
        } else {
            format!("{name} {}", self.root_alias())
        }
    }

    fn placeholder(&self, field: &FieldDefinition) -> String {
        self.dialect.placeholder(field.name)
    }

    fn key_condition(&self, qualifier: Option<&str>) -> String {
        self.table
            .primary_key_fields()
            .map(|field| {
                let column = qualifier.map_or_else(
                    || field.name.to_string(),
                    |alias| format!("{alias}.{}", field.name),
                );
                format!("{column} = {}", self.placeholder(field))
            })
            .collect::<Vec<_>>()
            .join(" and ")
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    // Select list plus `from ... left join ...`.
    fn joined_source(&self) -> Result<(Vec<String>, String), SchemaError> {
        let mut columns = Vec::new();
        let mut joins = Vec::new();
        let mut path = vec![self.table.type_id()];
        collect_select(
            self.table,
            self.root_alias(),
            "",
            &mut path,
            &mut columns,
            &mut joins,
        )?;

        let mut source = format!("from {}", self.from_clause());
        for join in joins {
            source.push('\n');
            source.push_str(&join);
        }

        Ok((columns, source))
    }

    /// Column list and joins, without a where clause.
    pub fn select(&self) -> Result<String, SchemaError> {
        let (columns, source) = self.joined_source()?;

        Ok(format!("select {}\n{source}", columns.join(", ")))
    }

    /// Select filtered by a predicate compiled with [`Self::root_alias`].
    pub fn select_where(&self, predicate: Option<&CompiledPredicate>) -> Result<String, SchemaError> {
        Ok(with_where(self.select()?, predicate))
    }

    /// Select one object by primary key.
    pub fn reload(&self) -> Result<String, SchemaError> {
        self.table.require_primary_key("reload")?;

        Ok(format!(
            "{}\nwhere {}",
            self.select()?,
            self.key_condition(Some(self.root_alias()))
        ))
    }

    /// `count(0)` over the joined select, filtered by the predicate.
    pub fn count(&self, predicate: Option<&CompiledPredicate>) -> Result<String, SchemaError> {
        let (_, source) = self.joined_source()?;

        Ok(with_where(
            format!("select count(0) as {COUNT_ALIAS}\n{source}"),
            predicate,
        ))
    }

    /// Primary-key existence probe used by `save_changes`.
    pub fn existence_check(&self) -> Result<String, SchemaError> {
        self.table.require_primary_key("existence check")?;

        Ok(format!(
            "select count(0) as {COUNT_ALIAS} from {}\nwhere {}",
            self.table.name(),
            self.key_condition(None)
        ))
    }

    // ---------------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------------

    /// Insert of every saveable column. Identity columns are written only
    /// when `ignore_automatic` is false; computed columns never are.
    #[must_use]
    pub fn insert(&self, ignore_automatic: bool) -> String {
        let fields: Vec<_> = self
            .table
            .scalar_fields()
            .filter(|f| !f.options.ignore_for_save)
            .filter(|f| f.options.automatic != AutomaticValue::Computed)
            .filter(|f| !(ignore_automatic && f.is_automatic()))
            .collect();

        let columns = fields.iter().map(|f| f.name).collect::<Vec<_>>().join(", ");
        let values = fields
            .iter()
            .map(|f| self.placeholder(f))
            .collect::<Vec<_>>()
            .join(", ");

        format!("insert into {} ({columns}) values ({values})", self.table.name())
    }

    /// Update of non-key, non-automatic columns, keyed by primary key.
    pub fn update(&self) -> Result<String, SchemaError> {
        self.table.require_primary_key("update")?;

        let mut assignments: Vec<_> = self
            .table
            .scalar_fields()
            .filter(|f| !f.options.ignore_for_save && !f.is_primary_key() && !f.is_automatic())
            .map(|f| format!("{} = {}", f.name, self.placeholder(f)))
            .collect();

        // key-only tables still report matched rows
        if assignments.is_empty() {
            assignments = self
                .table
                .primary_key_fields()
                .map(|f| format!("{} = {}", f.name, self.placeholder(f)))
                .collect();
        }

        Ok(format!(
            "update {} set {}\nwhere {}",
            self.table.name(),
            assignments.join(", "),
            self.key_condition(None)
        ))
    }

    pub fn delete(&self) -> Result<String, SchemaError> {
        self.table.require_primary_key("delete")?;

        Ok(format!(
            "delete from {}\nwhere {}",
            self.table.name(),
            self.key_condition(None)
        ))
    }

    /// Delete every row matching a predicate compiled without a root alias.
    #[must_use]
    pub fn delete_all(&self, predicate: Option<&CompiledPredicate>) -> String {
        with_where(format!("delete from {}", self.table.name()), predicate)
    }

    /// Remove all rows; SQLite has no `truncate`.
    #[must_use]
    pub fn truncate(&self) -> String {
        match self.dialect.database_type {
            DatabaseType::Sqlite => format!("delete from {}", self.table.name()),
            _ => format!("truncate table {}", self.table.name()),
        }
    }

    // ---------------------------------------------------------------------
    // DDL
    // ---------------------------------------------------------------------

    #[must_use]
    pub fn create_table(&self) -> String {
        let keys: Vec<_> = self.table.primary_key_fields().collect();
        let identity = self.table.identity_field();
        let inline_key = self.dialect.inline_identity_key
            && matches!((keys.as_slice(), identity), ([key], Some(id)) if key.name == id.name);

        let mut lines: Vec<String> = self
            .table
            .scalar_fields()
            .map(|field| self.column_definition(field, inline_key))
            .collect();

        if !keys.is_empty() && !inline_key {
            let names: Vec<_> = keys.iter().map(|f| f.name).collect();
            lines.push(format!("primary key ({})", names.join(", ")));
        }

        format!(
            "create table {} (\n    {}\n)",
            self.table.name(),
            lines.join(",\n    ")
        )
    }

    fn column_definition(&self, field: &FieldDefinition, inline_key: bool) -> String {
        let is_identity = field.options.automatic == AutomaticValue::Identity;
        let value_type = field.value_type().unwrap_or(ValueType::Text);

        if is_identity && (inline_key || !self.dialect.inline_identity_key) {
            return format!("{} {}", field.name, self.dialect.identity_column());
        }

        let null = if field.is_nullable() { "null" } else { "not null" };

        format!("{} {} {null}", field.name, self.dialect.column_type(value_type))
    }

    #[must_use]
    pub fn drop_table(&self) -> String {
        format!("drop table {}", self.table.name())
    }

    // ---------------------------------------------------------------------
    // Dispatch
    // ---------------------------------------------------------------------

    /// Render the statement for `kind`; `None` for kinds without a
    /// generated form.
    pub fn render(
        &self,
        kind: StatementKind,
        predicate: Option<&CompiledPredicate>,
    ) -> Result<Option<String>, SchemaError> {
        let sql = match kind {
            StatementKind::Select => self.select_where(predicate)?,
            StatementKind::SelectReload => self.reload()?,
            StatementKind::Insert => self.insert(true),
            StatementKind::Update => self.update()?,
            StatementKind::Delete => self.delete()?,
            StatementKind::DeleteAll => self.delete_all(predicate),
            StatementKind::ExistenceCheck => self.existence_check()?,
            StatementKind::CreateTable => self.create_table(),
            StatementKind::DropTable => self.drop_table(),
            StatementKind::None | StatementKind::UnknownStatement => return Ok(None),
        };

        Ok(Some(sql))
    }
}

fn with_where(mut sql: String, predicate: Option<&CompiledPredicate>) -> String {
    if let Some(predicate) = predicate.filter(|p| !p.is_empty()) {
        sql.push_str("\nwhere ");
        sql.push_str(&predicate.command_text);
    }

    sql
}

// Walk the association tree depth-first, emitting `alias.col as prefixcol`
// and one left join per association. `path` holds the types on the current
// branch for cycle detection.
fn collect_select(
    table: &TableDefinition,
    alias: &str,
    prefix: &str,
    path: &mut Vec<TypeId>,
    columns: &mut Vec<String>,
    joins: &mut Vec<String>,
) -> Result<(), SchemaError> {
    for field in table.scalar_fields() {
        columns.push(format!("{alias}.{0} as {prefix}{0}", field.name));
    }

    for field in table.association_fields() {
        let Some(association) = field.association() else {
            continue;
        };
        let target: Arc<TableDefinition> = association.target();
        if path.contains(&target.type_id()) {
            return Err(SchemaError::AssociationCycle {
                entity: table.entity_name().to_string(),
                field: field.name.to_string(),
            });
        }

        let child_alias = format!("{prefix}{}", field.name);
        let target_name = target.name();
        joins.push(format!(
            "left join {target_name} {child_alias} on {child_alias}.{} = {alias}.{}",
            association.keys.child_column, association.keys.parent_column
        ));

        path.push(target.type_id());
        collect_select(
            &target,
            &child_alias,
            &format!("{child_alias}_"),
            path,
            columns,
            joins,
        )?;
        path.pop();
    }

    Ok(())
}

/// True when a saved create-table script matches a freshly generated one.
/// Line-ending differences are ignored.
#[must_use]
pub fn ddl_matches(saved: &str, generated: &str) -> bool {
    let normalize = |s: &str| s.replace("\r\n", "\n").trim_end().to_string();

    normalize(saved) == normalize(generated)
}
