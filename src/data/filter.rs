use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

use log::debug;
use serde::{Deserialize, Serialize};

use super::error::{ExploreError, Result};
use super::model::{Column, Indicator, Row, Table, View};

// ---------------------------------------------------------------------------
// Constraint – one per-column predicate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// Closed numeric range `[min, max]`; null values never match.
    Range { min: f64, max: f64 },
    /// Allowed text values; an empty set matches nothing.
    Categories(BTreeSet<String>),
}

// -- Manual Eq/Hash (bitwise on floats) so FilterSpec can key a memo cache --

impl PartialEq for Constraint {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Constraint::Range { min: a0, max: a1 }, Constraint::Range { min: b0, max: b1 }) => {
                a0.to_bits() == b0.to_bits() && a1.to_bits() == b1.to_bits()
            }
            (Constraint::Categories(a), Constraint::Categories(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Constraint {}

impl Hash for Constraint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Constraint::Range { min, max } => {
                min.to_bits().hash(state);
                max.to_bits().hash(state);
            }
            Constraint::Categories(values) => values.hash(state),
        }
    }
}

impl Constraint {
    fn matches(&self, row: &Row, column: Column) -> bool {
        match (self, column) {
            (Constraint::Range { min, max }, Column::Indicator(ind)) => row
                .value(ind)
                .is_some_and(|v| *min <= v && v <= *max),
            (Constraint::Categories(allowed), col) => {
                row.text(col).is_some_and(|v| allowed.contains(v))
            }
            // rejected by `validate`
            (Constraint::Range { .. }, _) => false,
        }
    }

    fn validate(&self, name: &str) -> Result<Column> {
        let column = Column::from_name(name)
            .ok_or_else(|| ExploreError::invalid_filter(name, "no such column"))?;
        match (self, column) {
            (Constraint::Range { min, max }, Column::Indicator(_)) => {
                if min.is_nan() || max.is_nan() {
                    Err(ExploreError::invalid_filter(name, "range bound is NaN"))
                } else if min > max {
                    Err(ExploreError::invalid_filter(
                        name,
                        format!("range min {min} exceeds max {max}"),
                    ))
                } else {
                    Ok(column)
                }
            }
            (Constraint::Range { .. }, _) => Err(ExploreError::invalid_filter(
                name,
                "range constraint on a text column",
            )),
            (Constraint::Categories(_), Column::Indicator(_)) => Err(ExploreError::invalid_filter(
                name,
                "category constraint on a numeric column",
            )),
            (Constraint::Categories(_), _) => Ok(column),
        }
    }
}

// ---------------------------------------------------------------------------
// FilterSpec – column name → constraint
// ---------------------------------------------------------------------------

/// Declarative per-column constraints. A row passes when it satisfies all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSpec {
    constraints: BTreeMap<String, Constraint>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range(mut self, column: impl Into<String>, min: f64, max: f64) -> Self {
        self.constraints
            .insert(column.into(), Constraint::Range { min, max });
        self
    }

    pub fn with_categories<I, S>(mut self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.constraints
            .insert(column.into(), Constraint::Categories(values));
        self
    }

    /// Flip membership of `value` in a category constraint.
    ///
    /// A column without a constraint starts from an empty selection, so the
    /// first toggle selects exactly `value`.
    pub fn toggle_category(&mut self, column: &str, value: &str) {
        let entry = self
            .constraints
            .entry(column.to_string())
            .or_insert_with(|| Constraint::Categories(BTreeSet::new()));
        match entry {
            Constraint::Categories(selected) => {
                if !selected.remove(value) {
                    selected.insert(value.to_string());
                }
            }
            Constraint::Range { .. } => {
                *entry = Constraint::Categories(BTreeSet::from([value.to_string()]));
            }
        }
    }

    /// Drop the constraint on `column` (show everything).
    pub fn clear(&mut self, column: &str) {
        self.constraints.remove(column);
    }

    /// Select nothing in `column` (hide everything).
    pub fn select_none(&mut self, column: &str) {
        self.constraints
            .insert(column.to_string(), Constraint::Categories(BTreeSet::new()));
    }

    pub fn get(&self, column: &str) -> Option<&Constraint> {
        self.constraints.get(column)
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Constraint)> {
        self.constraints.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Check every constraint against the schema before any scan.
    fn resolve(&self) -> Result<Vec<(Column, &Constraint)>> {
        self.constraints
            .iter()
            .map(|(name, c)| c.validate(name).map(|col| (col, c)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Select the rows of `table` passing every constraint in `spec`, in table order.
pub fn apply<'a>(table: &'a Table, spec: &FilterSpec) -> Result<View<'a>> {
    let resolved = spec.resolve()?;
    let indices: Vec<usize> = table
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| resolved.iter().all(|(col, c)| c.matches(row, *col)))
        .map(|(i, _)| i)
        .collect();
    debug!(
        "Filter with {} constraint(s) kept {}/{} rows",
        resolved.len(),
        indices.len(),
        table.len()
    );
    Ok(View::from_indices(table, indices))
}

/// Rows of `view` with a value in every one of `indicators`.
pub fn complete_cases<'a>(view: &View<'a>, indicators: &[Indicator]) -> View<'a> {
    let rows = view.table().rows();
    let indices = view
        .indices()
        .iter()
        .copied()
        .filter(|&i| indicators.iter().all(|&ind| rows[i].value(ind).is_some()))
        .collect();
    View::from_indices(view.table(), indices)
}
