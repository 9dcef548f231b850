//! Transform pipeline
//!
//! Column transforms rewrite one value at a time, chained in configuration
//! order. Computed columns see the whole row, before any column transform
//! has run, and produce one new value each.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::schema::Column;
use crate::script::{CompiledFunction, ScriptEngine, from_script, to_script};
use crate::table_extract::ComputedColumn;
use crate::value::Value;

/// Chain every function over `value`, each consuming the previous output
pub fn apply(column: &str, value: Value, functions: &[CompiledFunction<'_>]) -> Result<Value> {
    if functions.is_empty() {
        return Ok(value);
    }
    let mut current = to_script(&value);
    for function in functions {
        current = function.eval(minijinja::context! {
            value => current,
            column => column,
        })?;
    }
    let last = functions.last().map_or(column, |f| f.label());
    from_script(last, &current)
}

/// Evaluate a computed column function over a whole row
pub fn compute(row: &[Value], columns: &[Column], function: &CompiledFunction<'_>) -> Result<Value> {
    let values: BTreeMap<String, minijinja::Value> = columns
        .iter()
        .zip(row)
        .map(|(column, value)| (column.name.clone(), to_script(value)))
        .collect();
    let mut context = values.clone();
    context.insert("row".to_string(), minijinja::Value::from(values));

    let out = function.eval(minijinja::Value::from(context))?;
    from_script(function.label(), &out)
}

/// Transform and computed-column functions compiled for one extraction
pub struct TransformPipeline<'e> {
    /// Per-position column transforms, aligned with the selected columns
    transforms: Vec<Vec<CompiledFunction<'e>>>,
    computed: Vec<CompiledFunction<'e>>,
    columns: Vec<Column>,
}

impl<'e> TransformPipeline<'e> {
    /// Compile the functions for `columns`
    ///
    /// A transform naming a column outside `columns` is a configuration error.
    pub fn compile(
        engine: &'e ScriptEngine,
        columns: &[Column],
        column_transforms: &BTreeMap<String, Vec<String>>,
        computed_columns: &[ComputedColumn],
    ) -> Result<Self> {
        if let Some(unknown) = column_transforms
            .keys()
            .find(|name| !columns.iter().any(|c| c.name.eq_ignore_ascii_case(name)))
        {
            return Err(Error::config(format!(
                "transform configured for unknown column '{unknown}'"
            )));
        }

        let mut transforms = Vec::with_capacity(columns.len());
        for column in columns {
            let functions = column_transforms
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(&column.name))
                .map(|(_, functions)| functions.as_slice())
                .unwrap_or_default();
            let compiled = functions
                .iter()
                .enumerate()
                .map(|(i, source)| engine.compile(&format!("{}[{i}]", column.name), source))
                .collect::<Result<Vec<_>>>()?;
            transforms.push(compiled);
        }

        let computed = computed_columns
            .iter()
            .map(|c| engine.compile(&c.name, &c.function))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            transforms,
            computed,
            columns: columns.to_vec(),
        })
    }

    /// Transform a fetched row and append its computed values
    pub fn process(&self, row: Vec<Value>) -> Result<Vec<Value>> {
        let mut computed = Vec::with_capacity(self.computed.len());
        for function in &self.computed {
            computed.push(compute(&row, &self.columns, function)?);
        }

        let mut out = Vec::with_capacity(row.len() + computed.len());
        for ((value, functions), column) in row.into_iter().zip(&self.transforms).zip(&self.columns) {
            out.push(apply(&column.name, value, functions)?);
        }
        out.extend(computed);
        Ok(out)
    }
}
