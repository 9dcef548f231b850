//! Load strategies
//!
//! One [`LoadStrategy`] value drives both halves of an extract-load: the
//! WHERE filter applied while extracting and the write semantics applied
//! while loading.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::dialect::Dialect;
use crate::error::{Error, Result};

/// Upper bound for `go_back_hours`, one hundred years
pub const MAX_GO_BACK_HOURS: i64 = 24 * 366 * 100;

/// How rows are selected from the source and written to the destination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStrategy {
    /// Replace the destination's rows wholesale
    #[default]
    Full,
    /// Upsert every source row by primary key
    Incremental,
    /// Upsert rows modified within a trailing window
    ModifiedOnly,
}

impl fmt::Display for LoadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoadStrategy::Full => "full",
            LoadStrategy::Incremental => "incremental",
            LoadStrategy::ModifiedOnly => "modified_only",
        })
    }
}

/// Strategy plus the options it needs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadOptions {
    /// Load strategy
    #[serde(default)]
    pub strategy: LoadStrategy,

    /// Upsert key (Incremental, ModifiedOnly)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,

    /// Column compared against the window start (ModifiedOnly)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at_column: Option<String>,

    /// Window length in hours (ModifiedOnly)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub go_back_hours: Option<i64>,
}

impl LoadOptions {
    /// Full replace
    pub fn full() -> Self {
        Self::default()
    }

    /// Upsert by `primary_key`
    pub fn incremental(primary_key: impl Into<String>) -> Self {
        Self {
            strategy: LoadStrategy::Incremental,
            primary_key: Some(primary_key.into()),
            ..Self::default()
        }
    }

    /// Upsert rows whose `modified_at_column` falls within the last `go_back_hours`
    pub fn modified_only(
        primary_key: impl Into<String>,
        modified_at_column: impl Into<String>,
        go_back_hours: i64,
    ) -> Self {
        Self {
            strategy: LoadStrategy::ModifiedOnly,
            primary_key: Some(primary_key.into()),
            modified_at_column: Some(modified_at_column.into()),
            go_back_hours: Some(go_back_hours),
        }
    }

    /// Check that the strategy has the options it needs
    pub fn validate(&self) -> Result<()> {
        if self.strategy == LoadStrategy::Full {
            return Ok(());
        }
        if self.primary_key.as_deref().is_none_or(str::is_empty) {
            return Err(Error::config(format!(
                "load strategy '{}' requires primary_key",
                self.strategy
            )));
        }
        if self.strategy == LoadStrategy::ModifiedOnly {
            if self.modified_at_column.as_deref().is_none_or(str::is_empty) {
                return Err(Error::config(
                    "load strategy 'modified_only' requires modified_at_column",
                ));
            }
            match self.go_back_hours {
                Some(hours) if hours > 0 && hours <= MAX_GO_BACK_HOURS => {}
                Some(hours) if hours > 0 => {
                    return Err(Error::config(format!(
                        "go_back_hours {hours} exceeds the maximum of {MAX_GO_BACK_HOURS}"
                    )));
                }
                _ => {
                    return Err(Error::config(
                        "load strategy 'modified_only' requires a positive go_back_hours",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Extraction filter for this strategy, evaluated against `now`
    ///
    /// Only ModifiedOnly filters: `<modified_at_column> > '<now - go_back_hours>'`.
    pub fn where_statement(&self, dialect: &dyn Dialect, now: NaiveDateTime) -> Option<String> {
        if self.strategy != LoadStrategy::ModifiedOnly {
            return None;
        }
        let column = self.modified_at_column.as_deref()?;
        let since = Duration::try_hours(self.go_back_hours?)
            .and_then(|back| now.checked_sub_signed(back))?;
        Some(format!(
            "{} > {}",
            dialect.quote_ident(column),
            dialect.quote_string(&since.format("%Y-%m-%d %H:%M:%S").to_string())
        ))
    }
}
