//! Per-table extraction policy

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::schema::{Column, ColumnOption, DataType, Options};
use crate::script::ScriptEngine;
use crate::strategy::LoadOptions;

/// A column synthesized per row from the other columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputedColumn {
    /// Column name
    pub name: String,

    /// Declared type, used for DDL and CSV encoding
    pub data_type: DataType,

    /// Type modifiers
    #[serde(default, skip_serializing_if = "Options::is_empty")]
    pub options: Options,

    /// Expression over the row's columns
    pub function: String,
}

impl ComputedColumn {
    /// The column this adds to the extracted table
    pub fn to_column(&self) -> Column {
        let mut column = Column::new(&self.name, self.data_type).with_option(ColumnOption::Computed, 1);
        for (option, value) in &self.options {
            column.options.entry(*option).or_insert(*value);
        }
        column
    }
}

/// How one table is extracted and loaded
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableExtract {
    /// Strategy and its options
    #[serde(default, rename = "load_strategy")]
    pub load_options: LoadOptions,

    /// Column name to transform expressions, applied in order
    #[serde(default, rename = "transforms")]
    pub column_transforms: BTreeMap<String, Vec<String>>,

    /// Columns appended after the source columns, in order
    #[serde(default)]
    pub computed_columns: Vec<ComputedColumn>,
}

impl TableExtract {
    /// Validate strategy options, computed column types and every expression
    pub fn validate(&self, engine: &ScriptEngine) -> Result<()> {
        self.load_options.validate()?;

        for (column, functions) in &self.column_transforms {
            for (i, function) in functions.iter().enumerate() {
                engine.compile(&format!("{column}[{i}]"), function)?;
            }
        }

        for (i, computed) in self.computed_columns.iter().enumerate() {
            if self.computed_columns[..i]
                .iter()
                .any(|c| c.name.eq_ignore_ascii_case(&computed.name))
            {
                return Err(Error::config(format!(
                    "computed column '{}' is declared twice",
                    computed.name
                )));
            }
            computed.to_column().validate()?;
            if computed.data_type == DataType::Unknown {
                return Err(Error::config(format!(
                    "computed column '{}' needs a concrete data_type",
                    computed.name
                )));
            }
            engine.compile(&computed.name, &computed.function)?;
            if self
                .column_transforms
                .keys()
                .any(|column| column.eq_ignore_ascii_case(&computed.name))
            {
                return Err(Error::config(format!(
                    "transforms cannot target computed column '{}'",
                    computed.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::LoadStrategy;

    const YAML: &str = r#"
load_strategy:
  strategy: incremental
  primary_key: id
transforms:
  name: ["value | trim", "value | upper"]
computed_columns:
  - name: name_hash
    data_type: STRING
    options: { LENGTH: 64 }
    function: "name | sha256"
"#;

    #[test]
    fn test_parse_table_extract() {
        let extract: TableExtract = serde_yaml::from_str(YAML).unwrap();
        assert_eq!(extract.load_options.strategy, LoadStrategy::Incremental);
        assert_eq!(extract.column_transforms["name"].len(), 2);
        assert_eq!(extract.computed_columns[0].name, "name_hash");
        extract.validate(&ScriptEngine::new()).unwrap();

        let column = extract.computed_columns[0].to_column();
        assert!(column.is_computed());
        assert_eq!(column.option(ColumnOption::Length), Some(64));
    }

    #[test]
    fn test_transform_on_computed_column_is_rejected() {
        let mut extract: TableExtract = serde_yaml::from_str(YAML).unwrap();
        extract
            .column_transforms
            .insert("NAME_HASH".to_string(), vec!["value | lower".to_string()]);

        let err = extract.validate(&ScriptEngine::new()).unwrap_err();
        assert!(err.is_configuration(), "{err}");
        assert!(err.to_string().contains("computed column 'name_hash'"), "{err}");
    }

    #[test]
    fn test_default_is_full_without_functions() {
        let extract: TableExtract = serde_yaml::from_str("{}").unwrap();
        assert_eq!(extract, TableExtract::default());
        extract.validate(&ScriptEngine::new()).unwrap();
    }

    #[test]
    fn test_bad_expression_fails_validation() {
        let mut extract: TableExtract = serde_yaml::from_str(YAML).unwrap();
        extract
            .column_transforms
            .insert("name".to_string(), vec!["value | | upper".to_string()]);
        let err = extract.validate(&ScriptEngine::new()).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("name[0]"), "{err}");
    }

    #[test]
    fn test_invalid_computed_options_fail_validation() {
        let mut extract: TableExtract = serde_yaml::from_str(YAML).unwrap();
        extract.computed_columns[0].data_type = DataType::Integer;
        let err = extract.validate(&ScriptEngine::new()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(serde_yaml::from_str::<TableExtract>("strategy: full\n").is_err());
    }
}
