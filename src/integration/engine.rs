use crate::db::connections::{ConnectionProvider, EndpointPool};
use crate::db::metadata;
use crate::db::query_execution;
use crate::db::sql_utils::{is_plain_identifier, placeholder, quote_column_name, quote_table_name};
use crate::db_types::{ColumnSchema, DatabaseType, EndpointRole};
use crate::error::{BridgeResult, IntegrationError};
use crate::integration::models::{
    group_mappings, validate_mappings, IdentityConfig, IdentityGeneration, ColumnMapping,
    MappingGroup, MatchCriterion, MergePhase, TablePair,
};
use serde_json::Value;
use uuid::Uuid;

/// Stateless integration service over two endpoint pools. Groups the
/// caller's mappings by table pair and drives one read/write cycle per
/// group; holds nothing between invocations.
pub struct IntegrationEngine {
    source: EndpointPool,
    dest: EndpointPool,
    identity: IdentityConfig,
}

impl IntegrationEngine {
    pub fn new(source: EndpointPool, dest: EndpointPool) -> Self {
        Self {
            source,
            dest,
            identity: IdentityConfig::default(),
        }
    }

    pub fn with_identity(mut self, identity: IdentityConfig) -> Self {
        self.identity = identity;
        self
    }

    pub async fn from_provider<P: ConnectionProvider + ?Sized>(provider: &P) -> BridgeResult<Self> {
        let source = provider.get_pool(EndpointRole::Source).await?;
        let dest = provider.get_pool(EndpointRole::Destination).await?;
        Ok(Self::new(source, dest))
    }

    /// Directed field copy: for each table-pair group, reads the first
    /// source row selected by `source_filter` and updates the destination
    /// rows selected by `dest_filter`. Groups are independent; a failure
    /// in one group does not undo earlier groups.
    pub async fn integrate(
        &self,
        mappings: &[ColumnMapping],
        source_filter: Option<&str>,
        dest_filter: Option<&str>,
    ) -> BridgeResult<u64> {
        if mappings.is_empty() {
            return Ok(0);
        }
        validate_mappings(mappings).map_err(IntegrationError::InvalidRequest)?;

        let mut total: u64 = 0;

        for group in group_mappings(mappings) {
            let pair = group.pair.clone();

            // The one place table existence is checked: a stale mapping
            // profile must not fail the whole call.
            let source_table_present = metadata::table_exists(&self.source, &pair.source_table)
                .await
                .map_err(|e| execution_error(MergePhase::ReadingSource, &pair, total, e))?;
            if !source_table_present {
                log::warn!(
                    "source table {} does not exist on the source endpoint; skipping {}",
                    pair.source_table,
                    pair
                );
                continue;
            }

            let source_schema = metadata::get_table_schema(&self.source, &pair.source_table)
                .await
                .map_err(|e| execution_error(MergePhase::ReadingSource, &pair, total, e))?;
            let dest_schema = metadata::get_table_schema(&self.dest, &pair.dest_table)
                .await
                .map_err(|e| execution_error(MergePhase::ReadingSource, &pair, total, e))?;

            for mapping in &group.mappings {
                ensure_column(
                    EndpointRole::Source,
                    &pair.source_table,
                    &source_schema,
                    &mapping.source_column.name,
                )?;
                ensure_column(
                    EndpointRole::Destination,
                    &pair.dest_table,
                    &dest_schema,
                    &mapping.dest_column.name,
                )?;
            }

            // The id surrogate rides along in the read when the source
            // table actually carries the configured column.
            let source_id = find_column(&source_schema, self.identity.id_column_for(&pair.source_table))
                .map(|column| column.name.clone());

            let select = build_simple_select(
                &self.source.db_type(),
                &group,
                source_id.as_deref(),
                source_filter,
            );
            log::debug!("integrate read: {}", select);
            let Some(row) = query_execution::fetch_first_row(&self.source, &select, &[])
                .await
                .map_err(|e| execution_error(MergePhase::ReadingSource, &pair, total, e))?
            else {
                continue;
            };
            let offset = usize::from(source_id.is_some());
            let values = row[offset..].to_vec();

            let affected = match normalize_filter(dest_filter) {
                Some(filter) => {
                    let update = build_update_with_filter(&self.dest.db_type(), &group, Some(filter));
                    log::debug!("integrate write: {}", update);
                    query_execution::execute(&self.dest, &update, &values)
                        .await
                        .map_err(|e| execution_error(MergePhase::Updating, &pair, total, e))?
                }
                None => {
                    // Refuse an unguarded full-table update: pin the write
                    // to the lowest destination identity value.
                    let dest_id = self.identity.id_column_for(&pair.dest_table).to_string();
                    ensure_column(
                        EndpointRole::Destination,
                        &pair.dest_table,
                        &dest_schema,
                        &dest_id,
                    )?;
                    log::warn!(
                        "no destination filter supplied for {}; guarding the update to a single row",
                        pair
                    );
                    let lowest =
                        build_lowest_id_select(&self.dest.db_type(), &pair.dest_table, &dest_id);
                    let Some(id_row) = query_execution::fetch_first_row(&self.dest, &lowest, &[])
                        .await
                        .map_err(|e| execution_error(MergePhase::Updating, &pair, total, e))?
                    else {
                        continue;
                    };
                    let update = build_update_by_id(&self.dest.db_type(), &group, &dest_id);
                    log::debug!("integrate write: {}", update);
                    let mut binds = values.clone();
                    binds.push(id_row[0].clone());
                    query_execution::execute(&self.dest, &update, &binds)
                        .await
                        .map_err(|e| execution_error(MergePhase::Updating, &pair, total, e))?
                }
            };

            log::info!("integrated {} row(s) for {}", affected, pair);
            total += affected;
        }

        Ok(total)
    }

    /// Upsert reconciliation: moves every source row selected by
    /// `source_filter` into the destination, updating the row whose match
    /// value already exists and inserting a new one otherwise. Each
    /// table-pair group runs in its own destination transaction; a
    /// failure rolls the whole group back, while groups already committed
    /// stay committed.
    pub async fn merge(
        &self,
        mappings: &[ColumnMapping],
        source_filter: &str,
        criterion: &MatchCriterion,
    ) -> BridgeResult<u64> {
        if mappings.is_empty() {
            return Ok(0);
        }
        validate_mappings(mappings).map_err(IntegrationError::InvalidRequest)?;
        criterion.validate().map_err(IntegrationError::InvalidRequest)?;

        let mut total: u64 = 0;

        for group in group_mappings(mappings) {
            let pair = group.pair.clone();

            let source_schema = metadata::get_table_schema(&self.source, &pair.source_table)
                .await
                .map_err(|e| execution_error(MergePhase::ReadingSource, &pair, total, e))?;
            let dest_schema = metadata::get_table_schema(&self.dest, &pair.dest_table)
                .await
                .map_err(|e| execution_error(MergePhase::ReadingSource, &pair, total, e))?;

            for mapping in &group.mappings {
                ensure_column(
                    EndpointRole::Source,
                    &pair.source_table,
                    &source_schema,
                    &mapping.source_column.name,
                )?;
                ensure_column(
                    EndpointRole::Destination,
                    &pair.dest_table,
                    &dest_schema,
                    &mapping.dest_column.name,
                )?;
            }
            ensure_column(
                EndpointRole::Source,
                &pair.source_table,
                &source_schema,
                &criterion.source_column,
            )?;
            ensure_column(
                EndpointRole::Destination,
                &pair.dest_table,
                &dest_schema,
                &criterion.dest_column,
            )?;

            // The destination id is selected for the existence check and
            // drives the update target, so it must exist. The source id
            // is only a read surrogate and may be absent.
            let dest_id = self.identity.id_column_for(&pair.dest_table).to_string();
            ensure_column(
                EndpointRole::Destination,
                &pair.dest_table,
                &dest_schema,
                &dest_id,
            )?;
            let source_id = find_column(&source_schema, self.identity.id_column_for(&pair.source_table))
                .map(|column| column.name.clone());

            let select = build_merge_select(
                &self.source.db_type(),
                &group,
                source_id.as_deref(),
                &criterion.source_column,
                source_filter,
            );
            log::debug!("merge read: {}", select);
            let result = query_execution::fetch_rows(&self.source, &select, &[])
                .await
                .map_err(|e| execution_error(MergePhase::ReadingSource, &pair, total, e))?;

            let match_idx = usize::from(source_id.is_some());
            let value_start = match_idx + 1;
            let db_type = self.dest.db_type();

            let mut tx = query_execution::begin(&self.dest).await.map_err(|e| {
                IntegrationError::Connectivity {
                    role: EndpointRole::Destination,
                    message: format!("failed to open a transaction: {}", e),
                }
            })?;

            let mut group_merged: u64 = 0;
            let mut failure: Option<(MergePhase, sqlx::Error)> = None;

            for row in &result.rows {
                let match_value = row.get(match_idx).cloned().unwrap_or(Value::Null);
                let values = &row[value_start..];

                let existence =
                    build_existence_select(&db_type, &pair.dest_table, &dest_id, &criterion.dest_column);
                let existing = match tx
                    .fetch_first_row(&existence, std::slice::from_ref(&match_value))
                    .await
                {
                    Ok(found) => found,
                    Err(e) => {
                        failure = Some((MergePhase::CheckingExistence, e));
                        break;
                    }
                };

                match existing {
                    Some(id_row) => {
                        let update = build_update_by_id(&db_type, &group, &dest_id);
                        log::debug!("merge update: {}", update);
                        let mut binds = values.to_vec();
                        binds.push(id_row[0].clone());
                        if let Err(e) = tx.execute(&update, &binds).await {
                            failure = Some((MergePhase::Updating, e));
                            break;
                        }
                        group_merged += 1;
                    }
                    None => {
                        let (insert, binds) = self.build_insert_for_row(
                            &db_type,
                            &pair,
                            &group,
                            &dest_id,
                            &criterion.dest_column,
                            &match_value,
                            values,
                        );
                        log::debug!("merge insert: {}", insert);
                        if let Err(e) = tx.execute(&insert, &binds).await {
                            failure = Some((MergePhase::Inserting, e));
                            break;
                        }
                        group_merged += 1;
                    }
                }
            }

            match failure {
                Some((phase, source)) => {
                    if let Err(rollback_error) = tx.rollback().await {
                        log::error!("rollback failed for {}: {}", pair, rollback_error);
                    }
                    return Err(execution_error(phase, &pair, total, source));
                }
                None => {
                    tx.commit()
                        .await
                        .map_err(|e| execution_error(MergePhase::Committing, &pair, total, e))?;
                }
            }

            log::info!("merged {} row(s) for {}", group_merged, pair);
            total += group_merged;
        }

        Ok(total)
    }

    /// Drives one `merge` per source filter and sums the counts. The
    /// original workflow selects several source rows and reconciles them
    /// one by one this way.
    pub async fn merge_many(
        &self,
        mappings: &[ColumnMapping],
        source_filters: &[String],
        criterion: &MatchCriterion,
    ) -> BridgeResult<u64> {
        let mut total: u64 = 0;
        for filter in source_filters {
            total += self.merge(mappings, filter, criterion).await?;
        }
        Ok(total)
    }

    #[allow(clippy::too_many_arguments)]
    fn build_insert_for_row(
        &self,
        db_type: &DatabaseType,
        pair: &TablePair,
        group: &MappingGroup,
        dest_id: &str,
        dest_match: &str,
        match_value: &Value,
        values: &[Value],
    ) -> (String, Vec<Value>) {
        let mut columns: Vec<String> = Vec::new();
        let mut binds: Vec<Value> = Vec::new();

        if self.identity.generation == IdentityGeneration::Uuid {
            columns.push(dest_id.to_string());
            binds.push(Value::String(Uuid::new_v4().to_string()));
        }

        columns.push(dest_match.to_string());
        binds.push(match_value.clone());

        for (mapping, value) in group.mappings.iter().zip(values) {
            let name = &mapping.dest_column.name;
            // already bound through the id/match slots
            if name.eq_ignore_ascii_case(dest_id) || name.eq_ignore_ascii_case(dest_match) {
                continue;
            }
            columns.push(name.clone());
            binds.push(value.clone());
        }

        (build_insert(db_type, &pair.dest_table, &columns), binds)
    }
}

// --- Identifier Validation ---

fn find_column<'a>(columns: &'a [ColumnSchema], name: &str) -> Option<&'a ColumnSchema> {
    columns
        .iter()
        .find(|column| column.name.eq_ignore_ascii_case(name))
}

/// Allow-list check: a name is interpolated into statement text only if
/// it is structurally a plain identifier and present in the endpoint's
/// introspected schema.
fn ensure_column(
    role: EndpointRole,
    table: &str,
    columns: &[ColumnSchema],
    name: &str,
) -> BridgeResult<()> {
    if is_plain_identifier(name) && find_column(columns, name).is_some() {
        return Ok(());
    }
    Err(IntegrationError::RejectedIdentifier {
        role,
        table: table.to_string(),
        identifier: name.to_string(),
    })
}

fn execution_error(
    phase: MergePhase,
    pair: &TablePair,
    rows_affected: u64,
    source: sqlx::Error,
) -> IntegrationError {
    IntegrationError::Execution {
        phase,
        source_table: pair.source_table.clone(),
        dest_table: pair.dest_table.clone(),
        rows_affected,
        source,
    }
}

// --- Statement Synthesis ---

fn normalize_filter(filter: Option<&str>) -> Option<&str> {
    filter.map(str::trim).filter(|value| !value.is_empty())
}

fn build_simple_select(
    db_type: &DatabaseType,
    group: &MappingGroup,
    id_column: Option<&str>,
    filter: Option<&str>,
) -> String {
    let mut columns: Vec<String> = Vec::new();
    if let Some(id) = id_column {
        columns.push(quote_column_name(db_type, id));
    }
    columns.extend(
        group
            .mappings
            .iter()
            .map(|mapping| quote_column_name(db_type, &mapping.source_column.name)),
    );

    let mut sql = format!(
        "SELECT {} FROM {}",
        columns.join(", "),
        quote_table_name(db_type, &group.pair.source_table)
    );
    if let Some(filter) = normalize_filter(filter) {
        sql.push_str(" WHERE ");
        sql.push_str(filter);
    }
    sql
}

fn build_merge_select(
    db_type: &DatabaseType,
    group: &MappingGroup,
    id_column: Option<&str>,
    match_column: &str,
    filter: &str,
) -> String {
    let mut columns: Vec<String> = Vec::new();
    if let Some(id) = id_column {
        columns.push(quote_column_name(db_type, id));
    }
    columns.push(quote_column_name(db_type, match_column));
    columns.extend(
        group
            .mappings
            .iter()
            .map(|mapping| quote_column_name(db_type, &mapping.source_column.name)),
    );

    let mut sql = format!(
        "SELECT {} FROM {}",
        columns.join(", "),
        quote_table_name(db_type, &group.pair.source_table)
    );
    if let Some(filter) = normalize_filter(Some(filter)) {
        sql.push_str(" WHERE ");
        sql.push_str(filter);
    }
    sql
}

fn build_update_with_filter(
    db_type: &DatabaseType,
    group: &MappingGroup,
    filter: Option<&str>,
) -> String {
    let assignments = group
        .mappings
        .iter()
        .enumerate()
        .map(|(index, mapping)| {
            format!(
                "{} = {}",
                quote_column_name(db_type, &mapping.dest_column.name),
                placeholder(db_type, index + 1)
            )
        })
        .collect::<Vec<String>>()
        .join(", ");

    let mut sql = format!(
        "UPDATE {} SET {}",
        quote_table_name(db_type, &group.pair.dest_table),
        assignments
    );
    if let Some(filter) = normalize_filter(filter) {
        sql.push_str(" WHERE ");
        sql.push_str(filter);
    }
    sql
}

fn build_update_by_id(db_type: &DatabaseType, group: &MappingGroup, id_column: &str) -> String {
    let assignments = group
        .mappings
        .iter()
        .enumerate()
        .map(|(index, mapping)| {
            format!(
                "{} = {}",
                quote_column_name(db_type, &mapping.dest_column.name),
                placeholder(db_type, index + 1)
            )
        })
        .collect::<Vec<String>>()
        .join(", ");

    format!(
        "UPDATE {} SET {} WHERE {} = {}",
        quote_table_name(db_type, &group.pair.dest_table),
        assignments,
        quote_column_name(db_type, id_column),
        placeholder(db_type, group.mappings.len() + 1)
    )
}

/// Existence probe with a deterministic tie-break: when several
/// destination rows share the match value, the lowest identity value is
/// the update target.
fn build_existence_select(
    db_type: &DatabaseType,
    table: &str,
    id_column: &str,
    match_column: &str,
) -> String {
    format!(
        "SELECT {} FROM {} WHERE {} = {} ORDER BY {} LIMIT 1",
        quote_column_name(db_type, id_column),
        quote_table_name(db_type, table),
        quote_column_name(db_type, match_column),
        placeholder(db_type, 1),
        quote_column_name(db_type, id_column)
    )
}

fn build_lowest_id_select(db_type: &DatabaseType, table: &str, id_column: &str) -> String {
    format!(
        "SELECT {} FROM {} ORDER BY {} LIMIT 1",
        quote_column_name(db_type, id_column),
        quote_table_name(db_type, table),
        quote_column_name(db_type, id_column)
    )
}

fn build_insert(db_type: &DatabaseType, table: &str, columns: &[String]) -> String {
    let quoted = columns
        .iter()
        .map(|column| quote_column_name(db_type, column))
        .collect::<Vec<String>>()
        .join(", ");
    let values = (1..=columns.len())
        .map(|position| placeholder(db_type, position))
        .collect::<Vec<String>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_table_name(db_type, table),
        quoted,
        values
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::query_execution::{execute, fetch_rows, run_script};
    use crate::mock_data;
    use crate::sqlite::create_memory_pool;
    use serde_json::json;

    fn people_group(columns: &[(&str, &str)]) -> MappingGroup {
        let mappings = columns
            .iter()
            .map(|(source, dest)| ColumnMapping::from_names("HR_ALL_PEOPLE", source, "RSRC", dest))
            .collect();
        MappingGroup {
            pair: TablePair {
                source_table: "HR_ALL_PEOPLE".to_string(),
                dest_table: "RSRC".to_string(),
            },
            mappings,
        }
    }

    fn people_mappings() -> Vec<ColumnMapping> {
        vec![
            ColumnMapping::from_names("HR_ALL_PEOPLE", "FULL_NAME", "RSRC", "NAME"),
            ColumnMapping::from_names("HR_ALL_PEOPLE", "EMAIL_ADDRESS", "RSRC", "EMAIL"),
        ]
    }

    async fn seeded_engine() -> IntegrationEngine {
        let source = mock_data::source_endpoint().await.unwrap();
        let dest = mock_data::dest_endpoint().await.unwrap();
        IntegrationEngine::new(source, dest)
    }

    // --- statement synthesis ---

    #[test]
    fn test_build_simple_select_text() {
        let group = people_group(&[("FULL_NAME", "NAME"), ("EMAIL_ADDRESS", "EMAIL")]);
        let sql = build_simple_select(
            &DatabaseType::MySQL,
            &group,
            Some("PERSON_ID"),
            Some("PERSON_ID = 101"),
        );
        assert_eq!(
            sql,
            "SELECT `PERSON_ID`, `FULL_NAME`, `EMAIL_ADDRESS` FROM `HR_ALL_PEOPLE` WHERE PERSON_ID = 101"
        );

        let bare = build_simple_select(&DatabaseType::SQLite, &group, None, None);
        assert_eq!(
            bare,
            "SELECT \"FULL_NAME\", \"EMAIL_ADDRESS\" FROM \"HR_ALL_PEOPLE\""
        );
    }

    #[test]
    fn test_build_merge_select_leads_with_id_and_match() {
        let group = people_group(&[("FULL_NAME", "NAME")]);
        let sql = build_merge_select(
            &DatabaseType::SQLite,
            &group,
            Some("PERSON_ID"),
            "EMAIL_ADDRESS",
            "PERSON_ID = 101",
        );
        assert_eq!(
            sql,
            "SELECT \"PERSON_ID\", \"EMAIL_ADDRESS\", \"FULL_NAME\" FROM \"HR_ALL_PEOPLE\" WHERE PERSON_ID = 101"
        );
    }

    #[test]
    fn test_build_update_by_id_placeholders() {
        let group = people_group(&[("FULL_NAME", "NAME"), ("EMAIL_ADDRESS", "EMAIL")]);
        let postgres = build_update_by_id(&DatabaseType::PostgreSQL, &group, "RSRC_ID");
        assert_eq!(
            postgres,
            "UPDATE \"RSRC\" SET \"NAME\" = $1, \"EMAIL\" = $2 WHERE \"RSRC_ID\" = $3"
        );
        let sqlite = build_update_by_id(&DatabaseType::SQLite, &group, "RSRC_ID");
        assert_eq!(
            sqlite,
            "UPDATE \"RSRC\" SET \"NAME\" = ?, \"EMAIL\" = ? WHERE \"RSRC_ID\" = ?"
        );
    }

    #[test]
    fn test_build_existence_select_orders_by_identity() {
        let sql = build_existence_select(&DatabaseType::SQLite, "RSRC", "RSRC_ID", "EMAIL");
        assert_eq!(
            sql,
            "SELECT \"RSRC_ID\" FROM \"RSRC\" WHERE \"EMAIL\" = ? ORDER BY \"RSRC_ID\" LIMIT 1"
        );
    }

    #[test]
    fn test_build_insert_text() {
        let columns = vec!["EMAIL".to_string(), "NAME".to_string()];
        assert_eq!(
            build_insert(&DatabaseType::PostgreSQL, "RSRC", &columns),
            "INSERT INTO \"RSRC\" (\"EMAIL\", \"NAME\") VALUES ($1, $2)"
        );
    }

    // --- engine behavior over seeded in-memory endpoints ---

    #[tokio::test]
    async fn test_empty_mappings_short_circuit() {
        // bare, unseeded endpoints: any statement would fail loudly
        let source = EndpointPool::from_sqlite(create_memory_pool().await.unwrap());
        let dest = EndpointPool::from_sqlite(create_memory_pool().await.unwrap());
        let engine = IntegrationEngine::new(source, dest);

        assert_eq!(engine.integrate(&[], None, None).await.unwrap(), 0);
        let criterion = MatchCriterion::new("EMAIL_ADDRESS", "EMAIL");
        assert_eq!(
            engine.merge(&[], "PERSON_ID = 1", &criterion).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_integrate_updates_single_row() {
        let engine = seeded_engine().await;
        let mappings = vec![ColumnMapping::from_names(
            "HR_ALL_PEOPLE",
            "FULL_NAME",
            "RSRC",
            "NAME",
        )];

        let affected = engine
            .integrate(&mappings, Some("PERSON_ID = 102"), Some("RSRC_ID = 2"))
            .await
            .unwrap();
        assert_eq!(affected, 1);

        let updated = fetch_rows(&engine.dest, "SELECT NAME FROM RSRC WHERE RSRC_ID = 2", &[])
            .await
            .unwrap();
        assert_eq!(updated.rows[0][0], json!("Emily Roberts"));

        let untouched = fetch_rows(&engine.dest, "SELECT NAME FROM RSRC WHERE RSRC_ID = 1", &[])
            .await
            .unwrap();
        assert_eq!(untouched.rows[0][0], json!("John Anderson"));
    }

    #[tokio::test]
    async fn test_integrate_with_default_identity_column() {
        let engine = seeded_engine().await;
        // neither table has an identity override; both fall back to ID
        let mappings = vec![ColumnMapping::from_names(
            "PROJECTS",
            "NAME",
            "PA_PROJECTS",
            "NAME",
        )];

        let affected = engine
            .integrate(&mappings, Some("ID = 3"), Some("ID = 2"))
            .await
            .unwrap();
        assert_eq!(affected, 1);

        let rows = fetch_rows(
            &engine.dest,
            "SELECT NAME FROM PA_PROJECTS WHERE ID = 2",
            &[],
        )
        .await
        .unwrap();
        assert_eq!(rows.rows[0][0], json!("Supply Chain Optimization Project"));
    }

    #[tokio::test]
    async fn test_integrate_missing_source_table_is_skipped() {
        let engine = seeded_engine().await;
        let mappings = vec![
            ColumnMapping::from_names("NO_SUCH_TABLE", "A", "RSRC", "NAME"),
            ColumnMapping::from_names("HR_ALL_PEOPLE", "FULL_NAME", "RSRC", "NAME"),
        ];

        let affected = engine
            .integrate(&mappings, Some("PERSON_ID = 103"), Some("RSRC_ID = 2"))
            .await
            .unwrap();
        // the dangling group is skipped, the healthy group still runs
        assert_eq!(affected, 1);
    }

    #[tokio::test]
    async fn test_integrate_empty_dest_filter_updates_at_most_one_row() {
        let engine = seeded_engine().await;
        let mappings = vec![ColumnMapping::from_names(
            "HR_ALL_PEOPLE",
            "JOB_TITLE",
            "RSRC",
            "ROLE",
        )];

        let affected = engine
            .integrate(&mappings, Some("PERSON_ID = 101"), None)
            .await
            .unwrap();
        assert_eq!(affected, 1);

        // guarded to the lowest RSRC_ID; the other row keeps its value
        let roles = fetch_rows(&engine.dest, "SELECT ROLE FROM RSRC ORDER BY RSRC_ID", &[])
            .await
            .unwrap();
        assert_eq!(roles.rows[0][0], json!("Project Manager"));
        assert_eq!(roles.rows[1][0], json!("Controller"));
    }

    #[tokio::test]
    async fn test_integrate_rejects_unknown_identifier() {
        let engine = seeded_engine().await;
        let mappings = vec![ColumnMapping::from_names(
            "HR_ALL_PEOPLE",
            "FULL_NAME",
            "RSRC",
            "NO_SUCH_COLUMN",
        )];

        let err = engine
            .integrate(&mappings, Some("PERSON_ID = 101"), Some("RSRC_ID = 1"))
            .await
            .unwrap_err();
        assert!(matches!(err, IntegrationError::RejectedIdentifier { .. }));
    }

    #[tokio::test]
    async fn test_merge_inserts_absent_row() {
        let engine = seeded_engine().await;
        let criterion = MatchCriterion::new("EMAIL_ADDRESS", "EMAIL");

        let merged = engine
            .merge(&people_mappings(), "PERSON_ID = 102", &criterion)
            .await
            .unwrap();
        assert_eq!(merged, 1);

        // the inserted row is found right back by its match value
        let rows = fetch_rows(
            &engine.dest,
            "SELECT NAME, EMAIL FROM RSRC WHERE EMAIL = ?",
            &[json!("emily.roberts@example.com")],
        )
        .await
        .unwrap();
        assert_eq!(rows.rows.len(), 1);
        assert_eq!(rows.rows[0][0], json!("Emily Roberts"));
    }

    #[tokio::test]
    async fn test_merge_updates_existing_row_in_place() {
        let engine = seeded_engine().await;
        execute(
            &engine.dest,
            "UPDATE RSRC SET NAME = 'Old' WHERE RSRC_ID = 1",
            &[],
        )
        .await
        .unwrap();

        let criterion = MatchCriterion::new("EMAIL_ADDRESS", "EMAIL");
        let merged = engine
            .merge(&people_mappings(), "PERSON_ID = 101", &criterion)
            .await
            .unwrap();
        assert_eq!(merged, 1);

        let rows = fetch_rows(
            &engine.dest,
            "SELECT RSRC_ID, NAME FROM RSRC WHERE EMAIL = ?",
            &[json!("john.anderson@example.com")],
        )
        .await
        .unwrap();
        // updated in place: same identity row, no duplicate
        assert_eq!(rows.rows.len(), 1);
        assert_eq!(rows.rows[0][0], json!(1));
        assert_eq!(rows.rows[0][1], json!("John Anderson"));
    }

    #[tokio::test]
    async fn test_merge_rolls_back_group_on_mid_batch_failure() {
        let engine = seeded_engine().await;
        let criterion = MatchCriterion::new("EMAIL_ADDRESS", "EMAIL");

        // 102 inserts cleanly; 104 carries a NULL FULL_NAME and violates
        // RSRC.NAME NOT NULL
        let err = engine
            .merge(&people_mappings(), "PERSON_ID IN (102, 104)", &criterion)
            .await
            .unwrap_err();
        match err {
            IntegrationError::Execution {
                phase,
                rows_affected,
                ..
            } => {
                assert_eq!(phase, MergePhase::Inserting);
                assert_eq!(rows_affected, 0);
            }
            other => panic!("unexpected error: {}", other),
        }

        // nothing from the failed group is visible
        let rows = fetch_rows(&engine.dest, "SELECT COUNT(*) FROM RSRC", &[])
            .await
            .unwrap();
        assert_eq!(rows.rows[0][0], json!(2));
    }

    #[tokio::test]
    async fn test_merge_many_sums_counts() {
        let engine = seeded_engine().await;
        let criterion = MatchCriterion::new("EMAIL_ADDRESS", "EMAIL");
        let filters = vec![
            "PERSON_ID = 101".to_string(),
            "PERSON_ID = 102".to_string(),
            "PERSON_ID = 103".to_string(),
        ];

        let merged = engine
            .merge_many(&people_mappings(), &filters, &criterion)
            .await
            .unwrap();
        // one update plus two inserts
        assert_eq!(merged, 3);

        let rows = fetch_rows(&engine.dest, "SELECT COUNT(*) FROM RSRC", &[])
            .await
            .unwrap();
        assert_eq!(rows.rows[0][0], json!(4));
    }

    #[tokio::test]
    async fn test_merge_no_matching_source_rows() {
        let engine = seeded_engine().await;
        let criterion = MatchCriterion::new("EMAIL_ADDRESS", "EMAIL");
        let merged = engine
            .merge(&people_mappings(), "PERSON_ID = 9999", &criterion)
            .await
            .unwrap();
        assert_eq!(merged, 0);
    }

    #[tokio::test]
    async fn test_merge_uuid_identity_policy() {
        let source = mock_data::source_endpoint().await.unwrap();
        let dest = EndpointPool::from_sqlite(create_memory_pool().await.unwrap());
        run_script(
            &dest,
            "CREATE TABLE CONTACTS (CONTACT_ID TEXT, EMAIL TEXT, NAME TEXT)",
        )
        .await
        .unwrap();

        let mut identity = IdentityConfig::default();
        identity
            .overrides
            .insert("CONTACTS".to_string(), "CONTACT_ID".to_string());
        identity.generation = IdentityGeneration::Uuid;
        let engine = IntegrationEngine::new(source, dest).with_identity(identity);

        let mappings = vec![ColumnMapping::from_names(
            "HR_ALL_PEOPLE",
            "FULL_NAME",
            "CONTACTS",
            "NAME",
        )];
        let criterion = MatchCriterion::new("EMAIL_ADDRESS", "EMAIL");
        let merged = engine
            .merge(&mappings, "PERSON_ID = 101", &criterion)
            .await
            .unwrap();
        assert_eq!(merged, 1);

        let rows = fetch_rows(&engine.dest, "SELECT CONTACT_ID FROM CONTACTS", &[])
            .await
            .unwrap();
        let id = rows.rows[0][0].as_str().expect("generated id");
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn test_spec_scenario_people_to_rsrc() {
        let source = EndpointPool::from_sqlite(create_memory_pool().await.unwrap());
        run_script(
            &source,
            "CREATE TABLE PEOPLE (ID INTEGER PRIMARY KEY, EMAIL TEXT, FULL_NAME TEXT);\n\
             INSERT INTO PEOPLE VALUES (1, 'a@x.com', 'Ann');",
        )
        .await
        .unwrap();
        let dest = EndpointPool::from_sqlite(create_memory_pool().await.unwrap());
        run_script(
            &dest,
            "CREATE TABLE RSRC (RSRC_ID INTEGER PRIMARY KEY, NAME TEXT, EMAIL TEXT)",
        )
        .await
        .unwrap();

        let engine = IntegrationEngine::new(source, dest);
        let mappings = vec![
            ColumnMapping::from_names("PEOPLE", "FULL_NAME", "RSRC", "NAME"),
            ColumnMapping::from_names("PEOPLE", "EMAIL", "RSRC", "EMAIL"),
        ];
        let criterion = MatchCriterion::new("EMAIL", "EMAIL");

        // no row with EMAIL='a@x.com' yet: one INSERT
        let merged = engine.merge(&mappings, "", &criterion).await.unwrap();
        assert_eq!(merged, 1);
        let rows = fetch_rows(
            &engine.dest,
            "SELECT NAME, EMAIL FROM RSRC WHERE EMAIL = ?",
            &[json!("a@x.com")],
        )
        .await
        .unwrap();
        assert_eq!(rows.rows.len(), 1);
        assert_eq!(rows.rows[0][0], json!("Ann"));

        // stale destination copy: the same merge updates it back in place
        execute(&engine.dest, "UPDATE RSRC SET NAME = 'Old'", &[])
            .await
            .unwrap();
        let merged = engine.merge(&mappings, "", &criterion).await.unwrap();
        assert_eq!(merged, 1);
        let rows = fetch_rows(&engine.dest, "SELECT COUNT(*), MAX(NAME) FROM RSRC", &[])
            .await
            .unwrap();
        assert_eq!(rows.rows[0][0], json!(1));
        assert_eq!(rows.rows[0][1], json!("Ann"));
    }
}
