use log::debug;
use serde::{Deserialize, Serialize};

use super::error::{ExploreError, Result};
use super::model::{resolve_indicator, Indicator, Row, View};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ascending,
    Descending,
}

/// One entry of a ranking. `rank` is 1-based.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRow<'a> {
    pub rank: usize,
    pub value: f64,
    pub row: &'a Row,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingResult<'a> {
    pub column: Indicator,
    pub direction: Direction,
    pub entries: Vec<RankedRow<'a>>,
}

impl<'a> RankingResult<'a> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn countries(&self) -> Vec<&'a str> {
        self.entries.iter().map(|e| e.row.country.as_str()).collect()
    }
}

/// The first `n` rows of `view` ordered by `column`.
///
/// Rows with a null in `column` are not ranked. Ties keep view order, so
/// the result is deterministic. Asking for more rows than are eligible
/// returns all of them.
pub fn top_n<'a>(
    view: &View<'a>,
    column: &str,
    n: usize,
    direction: Direction,
) -> Result<RankingResult<'a>> {
    let indicator = resolve_indicator(column)?;
    if n == 0 {
        return Err(ExploreError::InvalidCount { what: "n" });
    }

    let mut eligible: Vec<(f64, &'a Row)> = view
        .rows()
        .filter_map(|row| row.value(indicator).map(|v| (v, row)))
        .collect();

    // `sort_by` is stable and `Row` never stores `-0.0`, so numerically equal
    // values keep view order under `total_cmp`.
    match direction {
        Direction::Descending => eligible.sort_by(|a, b| b.0.total_cmp(&a.0)),
        Direction::Ascending => eligible.sort_by(|a, b| a.0.total_cmp(&b.0)),
    }
    debug!(
        "Ranking {indicator} {direction:?}: {} eligible of {}, taking {n}",
        eligible.len(),
        view.len()
    );

    let entries = eligible
        .into_iter()
        .take(n)
        .enumerate()
        .map(|(i, (value, row))| RankedRow {
            rank: i + 1,
            value,
            row,
        })
        .collect();

    Ok(RankingResult {
        column: indicator,
        direction,
        entries,
    })
}

/// The `n` lowest rows by `column` ("bottom 10").
pub fn bottom_n<'a>(view: &View<'a>, column: &str, n: usize) -> Result<RankingResult<'a>> {
    top_n(view, column, n, Direction::Ascending)
}
