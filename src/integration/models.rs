use crate::db_types::ColumnSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// One declared correspondence between a source column and a destination
/// column. Column descriptors are resolved against their endpoint's
/// introspected schema by the caller; the engine re-checks the names
/// against the live schema before interpolating them into SQL.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    pub source_table: String,
    pub source_column: ColumnSchema,
    pub dest_table: String,
    pub dest_column: ColumnSchema,
}

impl ColumnMapping {
    pub fn new(
        source_table: &str,
        source_column: ColumnSchema,
        dest_table: &str,
        dest_column: ColumnSchema,
    ) -> Self {
        Self {
            source_table: source_table.to_string(),
            source_column,
            dest_table: dest_table.to_string(),
            dest_column,
        }
    }

    /// Mapping from bare column names, descriptors left at defaults.
    pub fn from_names(
        source_table: &str,
        source_column: &str,
        dest_table: &str,
        dest_column: &str,
    ) -> Self {
        Self::new(
            source_table,
            ColumnSchema::named(source_column),
            dest_table,
            ColumnSchema::named(dest_column),
        )
    }

    pub fn table_pair(&self) -> TablePair {
        TablePair {
            source_table: self.source_table.clone(),
            dest_table: self.dest_table.clone(),
        }
    }
}

impl fmt::Display for ColumnMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.source_table, self.source_column.name, self.dest_table, self.dest_column.name
        )
    }
}

pub fn validate_mappings(mappings: &[ColumnMapping]) -> Result<(), String> {
    for (index, mapping) in mappings.iter().enumerate() {
        if mapping.source_table.trim().is_empty() {
            return Err(format!("Mapping {} has an empty sourceTable", index + 1));
        }
        if mapping.dest_table.trim().is_empty() {
            return Err(format!("Mapping {} has an empty destTable", index + 1));
        }
        if mapping.source_column.name.trim().is_empty() {
            return Err(format!("Mapping {} has an empty sourceColumn", index + 1));
        }
        if mapping.dest_column.name.trim().is_empty() {
            return Err(format!("Mapping {} has an empty destColumn", index + 1));
        }
    }
    Ok(())
}

// --- Grouping ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct TablePair {
    pub source_table: String,
    pub dest_table: String,
}

impl fmt::Display for TablePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source_table, self.dest_table)
    }
}

#[derive(Debug, Clone)]
pub struct MappingGroup {
    pub pair: TablePair,
    pub mappings: Vec<ColumnMapping>,
}

/// Partitions mappings by `(sourceTable, destTable)`, keeping first-seen
/// group order and the input-relative order of mappings within a group.
pub fn group_mappings(mappings: &[ColumnMapping]) -> Vec<MappingGroup> {
    let mut groups: Vec<MappingGroup> = Vec::new();
    for mapping in mappings {
        let pair = mapping.table_pair();
        if let Some(group) = groups.iter_mut().find(|group| group.pair == pair) {
            group.mappings.push(mapping.clone());
        } else {
            groups.push(MappingGroup {
                pair,
                mappings: vec![mapping.clone()],
            });
        }
    }
    groups
}

// --- Match Criterion ---

/// The columns deciding whether a destination row already corresponds to
/// a source row, keyed by business meaning rather than by primary key.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MatchCriterion {
    pub source_column: String,
    pub dest_column: String,
}

impl MatchCriterion {
    pub fn new(source_column: &str, dest_column: &str) -> Self {
        Self {
            source_column: source_column.to_string(),
            dest_column: dest_column.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.source_column.trim().is_empty() {
            return Err("sourceMatchColumn is required".to_string());
        }
        if self.dest_column.trim().is_empty() {
            return Err("destMatchColumn is required".to_string());
        }
        Ok(())
    }
}

// --- Identity Resolution ---

/// How the identity value of a freshly inserted destination row is
/// produced.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdentityGeneration {
    /// The id column is omitted from the INSERT; the destination's own
    /// auto-increment or sequence fills it.
    #[default]
    Delegated,
    /// A v4 UUID string is bound explicitly.
    Uuid,
}

fn default_identity_column() -> String {
    "ID".to_string()
}

/// Declarative table-name -> identity-column lookup with a generic
/// fallback. The two endpoints disagree on what "the primary key of a
/// person" is called, so the engine resolves the name per table instead
/// of assuming a shared convention.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct IdentityConfig {
    #[serde(default)]
    pub overrides: HashMap<String, String>,
    #[serde(default = "default_identity_column")]
    pub default_column: String,
    #[serde(default)]
    pub generation: IdentityGeneration,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        let mut overrides = HashMap::new();
        overrides.insert("HR_ALL_PEOPLE".to_string(), "PERSON_ID".to_string());
        overrides.insert("RSRC".to_string(), "RSRC_ID".to_string());
        Self {
            overrides,
            default_column: default_identity_column(),
            generation: IdentityGeneration::default(),
        }
    }
}

impl IdentityConfig {
    pub fn id_column_for(&self, table: &str) -> &str {
        self.overrides
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(table))
            .map(|(_, column)| column.as_str())
            .unwrap_or(&self.default_column)
    }
}

// --- Merge Phases ---

/// Per-group progress through a merge: reading the source cursor, then
/// per row an existence check followed by an update or an insert, then a
/// single commit. Errors are tagged with the phase they interrupted.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MergePhase {
    ReadingSource,
    CheckingExistence,
    Updating,
    Inserting,
    Committing,
}

impl MergePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergePhase::ReadingSource => "reading source rows",
            MergePhase::CheckingExistence => "existence check",
            MergePhase::Updating => "update",
            MergePhase::Inserting => "insert",
            MergePhase::Committing => "commit",
        }
    }
}

impl fmt::Display for MergePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Auto-Mapping ---

/// Known equivalent fields between the two HR schemas. Used to propose
/// mappings automatically when both column lists are loaded.
pub fn known_column_equivalences() -> Vec<(String, String)> {
    [
        ("PERSON_ID", "RSRC_ID"),
        ("FULL_NAME", "NAME"),
        ("EMAIL_ADDRESS", "EMAIL"),
        ("PHONE_NUMBER", "PHONE"),
        ("DEPARTMENT_NAME", "DEPARTMENT"),
        ("JOB_TITLE", "ROLE"),
    ]
    .iter()
    .map(|(source, dest)| (source.to_string(), dest.to_string()))
    .collect()
}

/// Walks the source columns in order and pairs each one with its known
/// destination equivalent, when that column actually exists on the
/// destination. Duplicate pairs are skipped.
pub fn auto_map(
    source_table: &str,
    source_columns: &[ColumnSchema],
    dest_table: &str,
    dest_columns: &[ColumnSchema],
    equivalences: &[(String, String)],
) -> Vec<ColumnMapping> {
    let mut mappings: Vec<ColumnMapping> = Vec::new();

    for source_column in source_columns {
        let Some((_, dest_name)) = equivalences
            .iter()
            .find(|(source_name, _)| source_name.eq_ignore_ascii_case(&source_column.name))
        else {
            continue;
        };

        let Some(dest_column) = dest_columns
            .iter()
            .find(|column| column.name.eq_ignore_ascii_case(dest_name))
        else {
            continue;
        };

        let duplicate = mappings.iter().any(|mapping| {
            mapping.source_column.name == source_column.name
                && mapping.dest_column.name == dest_column.name
        });
        if duplicate {
            continue;
        }

        mappings.push(ColumnMapping::new(
            source_table,
            source_column.clone(),
            dest_table,
            dest_column.clone(),
        ));
    }

    mappings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(st: &str, sc: &str, dt: &str, dc: &str) -> ColumnMapping {
        ColumnMapping::from_names(st, sc, dt, dc)
    }

    #[test]
    fn test_group_mappings_counts_distinct_pairs() {
        let mappings = vec![
            mapping("PEOPLE", "FULL_NAME", "RSRC", "NAME"),
            mapping("PROJECTS", "NAME", "PA_PROJECTS", "NAME"),
            mapping("PEOPLE", "EMAIL", "RSRC", "EMAIL"),
        ];

        let groups = group_mappings(&mappings);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].pair.source_table, "PEOPLE");
        assert_eq!(groups[0].mappings.len(), 2);
        assert_eq!(groups[1].pair.source_table, "PROJECTS");
        assert_eq!(groups[1].mappings.len(), 1);
    }

    #[test]
    fn test_group_mappings_preserves_relative_order() {
        let mappings = vec![
            mapping("PEOPLE", "A", "RSRC", "X"),
            mapping("PEOPLE", "B", "RSRC", "Y"),
            mapping("PEOPLE", "C", "RSRC", "Z"),
        ];

        let groups = group_mappings(&mappings);
        assert_eq!(groups.len(), 1);
        let names: Vec<&str> = groups[0]
            .mappings
            .iter()
            .map(|m| m.source_column.name.as_str())
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_group_mappings_empty_input() {
        assert!(group_mappings(&[]).is_empty());
    }

    #[test]
    fn test_mapping_display() {
        let m = mapping("PEOPLE", "FULL_NAME", "RSRC", "NAME");
        assert_eq!(m.to_string(), "PEOPLE.FULL_NAME -> RSRC.NAME");
    }

    #[test]
    fn test_validate_mappings_rejects_blank_names() {
        let bad = vec![mapping("PEOPLE", "", "RSRC", "NAME")];
        assert!(validate_mappings(&bad).is_err());
        let good = vec![mapping("PEOPLE", "FULL_NAME", "RSRC", "NAME")];
        assert!(validate_mappings(&good).is_ok());
    }

    #[test]
    fn test_match_criterion_validation() {
        assert!(MatchCriterion::new("EMAIL_ADDRESS", "EMAIL").validate().is_ok());
        assert!(MatchCriterion::new("", "EMAIL").validate().is_err());
        assert!(MatchCriterion::new("EMAIL_ADDRESS", " ").validate().is_err());
    }

    #[test]
    fn test_identity_config_lookup() {
        let identity = IdentityConfig::default();
        assert_eq!(identity.id_column_for("HR_ALL_PEOPLE"), "PERSON_ID");
        assert_eq!(identity.id_column_for("hr_all_people"), "PERSON_ID");
        assert_eq!(identity.id_column_for("RSRC"), "RSRC_ID");
        assert_eq!(identity.id_column_for("SOMETHING_ELSE"), "ID");
    }

    #[test]
    fn test_auto_map_pairs_known_columns() {
        let source = vec![
            ColumnSchema::named("PERSON_ID"),
            ColumnSchema::named("FULL_NAME"),
            ColumnSchema::named("EMAIL_ADDRESS"),
            ColumnSchema::named("HIRE_DATE"),
        ];
        let dest = vec![
            ColumnSchema::named("RSRC_ID"),
            ColumnSchema::named("NAME"),
            ColumnSchema::named("EMAIL"),
        ];

        let mappings = auto_map(
            "HR_ALL_PEOPLE",
            &source,
            "RSRC",
            &dest,
            &known_column_equivalences(),
        );

        let rendered: Vec<String> = mappings.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "HR_ALL_PEOPLE.PERSON_ID -> RSRC.RSRC_ID",
                "HR_ALL_PEOPLE.FULL_NAME -> RSRC.NAME",
                "HR_ALL_PEOPLE.EMAIL_ADDRESS -> RSRC.EMAIL",
            ]
        );
    }

    #[test]
    fn test_auto_map_skips_missing_destination_columns() {
        let source = vec![ColumnSchema::named("PHONE_NUMBER")];
        let dest = vec![ColumnSchema::named("NAME")];
        let mappings = auto_map("HR_ALL_PEOPLE", &source, "RSRC", &dest, &known_column_equivalences());
        assert!(mappings.is_empty());
    }
}
