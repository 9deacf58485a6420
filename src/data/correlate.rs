use log::debug;
use serde::Serialize;

use super::error::{ExploreError, Result};
use super::model::{resolve_indicator, Indicator, View};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedReason {
    /// Fewer than two rows have both values.
    TooFewRows,
    /// One of the columns is constant over the shared rows.
    ZeroVariance,
    /// The values differ, but too little to survive floating-point
    /// scaling (e.g. a spread far below the column's magnitude).
    Degenerate,
}

/// One coefficient of the matrix. Undefined cells are never reported as 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Cell {
    Defined { r: f64, rows: usize },
    Undefined { reason: UndefinedReason },
}

impl Cell {
    pub fn value(&self) -> Option<f64> {
        match self {
            Cell::Defined { r, .. } => Some(*r),
            Cell::Undefined { .. } => None,
        }
    }
}

/// Square, symmetric Pearson matrix over a set of indicators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    columns: Vec<Indicator>,
    /// Row-major, `columns.len()²` cells.
    cells: Vec<Cell>,
}

impl CorrelationMatrix {
    pub fn columns(&self) -> &[Indicator] {
        &self.columns
    }

    pub fn get(&self, a: Indicator, b: Indicator) -> Option<&Cell> {
        let i = self.columns.iter().position(|&c| c == a)?;
        let j = self.columns.iter().position(|&c| c == b)?;
        Some(&self.cells[i * self.columns.len() + j])
    }

    /// Cells of one matrix row, in column order.
    pub fn row(&self, a: Indicator) -> Option<&[Cell]> {
        let n = self.columns.len();
        let i = self.columns.iter().position(|&c| c == a)?;
        Some(&self.cells[i * n..(i + 1) * n])
    }
}

/// Pairwise-complete Pearson correlation between the named numeric columns.
///
/// Repeated names are collapsed onto their first occurrence.
pub fn correlate(view: &View<'_>, columns: &[&str]) -> Result<CorrelationMatrix> {
    if columns.is_empty() {
        return Err(ExploreError::invalid_column("", "no columns requested"));
    }
    let mut indicators: Vec<Indicator> = Vec::with_capacity(columns.len());
    for name in columns {
        let ind = resolve_indicator(name)?;
        if !indicators.contains(&ind) {
            indicators.push(ind);
        }
    }
    Ok(correlate_indicators(view, &indicators))
}

/// Matrix over every numeric column (the heatmap page).
pub fn correlate_all(view: &View<'_>) -> CorrelationMatrix {
    correlate_indicators(view, &Indicator::ALL)
}

fn correlate_indicators(view: &View<'_>, indicators: &[Indicator]) -> CorrelationMatrix {
    let n = indicators.len();
    let mut cells = vec![Cell::Undefined { reason: UndefinedReason::TooFewRows }; n * n];

    for i in 0..n {
        for j in i..n {
            let cell = pearson(view, indicators[i], indicators[j]);
            cells[i * n + j] = cell;
            cells[j * n + i] = cell;
        }
    }
    debug!("Correlated {n} column(s) over {} rows", view.len());

    CorrelationMatrix {
        columns: indicators.to_vec(),
        cells,
    }
}

fn pearson(view: &View<'_>, a: Indicator, b: Indicator) -> Cell {
    let (xs, ys): (Vec<f64>, Vec<f64>) = view
        .rows()
        .filter_map(|row| Some((row.value(a)?, row.value(b)?)))
        .unzip();

    let rows = xs.len();
    if rows < 2 {
        return Cell::Undefined { reason: UndefinedReason::TooFewRows };
    }
    if is_constant(&xs) || is_constant(&ys) {
        return Cell::Undefined { reason: UndefinedReason::ZeroVariance };
    }
    if a == b {
        return Cell::Defined { r: 1.0, rows };
    }

    let (xs, ys) = (unit_scaled(&xs), unit_scaled(&ys));
    let mean_x = xs.iter().sum::<f64>() / rows as f64;
    let mean_y = ys.iter().sum::<f64>() / rows as f64;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(&ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    match coefficient(sxy, sxx, syy) {
        Some(r) => Cell::Defined { r, rows },
        None => Cell::Undefined { reason: UndefinedReason::Degenerate },
    }
}

/// `sxy / sqrt(sxx * syy)`, or `None` unless both spreads are positive and
/// finite and the quotient is finite.
fn coefficient(sxy: f64, sxx: f64, syy: f64) -> Option<f64> {
    let usable = |s: f64| s > 0.0 && s.is_finite();
    if !usable(sxx) || !usable(syy) {
        return None;
    }
    let r = sxy / (sxx.sqrt() * syy.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Divide by the largest magnitude so sums of squares stay within range.
/// Pearson's r is unchanged by a positive scale factor.
fn unit_scaled(values: &[f64]) -> Vec<f64> {
    let scale = values.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    values.iter().map(|v| v / scale).collect()
}

/// Exact check: a rounded mean can leave tiny non-zero deviations.
fn is_constant(values: &[f64]) -> bool {
    values.iter().all(|&v| v == values[0])
}
