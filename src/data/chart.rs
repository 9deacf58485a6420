//! Chart-ready series derived from a view: scatter points and histograms.
//! Rendering is left to the caller.

use serde::Serialize;

use super::error::{ExploreError, Result};
use super::model::{resolve_indicator, Indicator, View};

// ---------------------------------------------------------------------------
// Scatter
// ---------------------------------------------------------------------------

/// One point; `region` is carried so the caller can colour by it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint<'a> {
    pub country: &'a str,
    pub region: &'a str,
    pub x: f64,
    pub y: f64,
}

/// Points for rows where both `x` and `y` are present, in view order.
pub fn scatter<'a>(view: &View<'a>, x: &str, y: &str) -> Result<Vec<ScatterPoint<'a>>> {
    let x = resolve_indicator(x)?;
    let y = resolve_indicator(y)?;
    Ok(view
        .rows()
        .filter_map(|row| {
            Some(ScatterPoint {
                country: &row.country,
                region: &row.region,
                x: row.value(x)?,
                y: row.value(y)?,
            })
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Histogram
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub column: Indicator,
    pub bins: Vec<Bin>,
    /// Rows left out because the value was null.
    pub nulls: usize,
}

impl Histogram {
    pub fn total(&self) -> usize {
        self.bins.iter().map(|b| b.count).sum()
    }
}

/// Equal-width histogram of `column` over its non-null range.
///
/// Bins are half-open except the last, which includes the maximum.
pub fn histogram(view: &View<'_>, column: &str, bins: usize) -> Result<Histogram> {
    let indicator = resolve_indicator(column)?;
    if bins == 0 {
        return Err(ExploreError::InvalidCount { what: "bins" });
    }

    let values: Vec<f64> = view.rows().filter_map(|r| r.value(indicator)).collect();
    let nulls = view.len() - values.len();

    let Some((lo, hi)) = values.iter().fold(None, |acc: Option<(f64, f64)>, &v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    }) else {
        return Ok(Histogram { column: indicator, bins: Vec::new(), nulls });
    };

    let width = (hi - lo) / bins as f64;
    // Constant column, or a range whose width over- or underflows.
    if lo == hi || !(width.is_finite() && width > 0.0) {
        let bins = vec![Bin { lower: lo, upper: hi, count: values.len() }];
        return Ok(Histogram { column: indicator, bins, nulls });
    }

    let mut out: Vec<Bin> = (0..bins)
        .map(|i| Bin {
            lower: lo + width * i as f64,
            upper: if i + 1 == bins { hi } else { lo + width * (i + 1) as f64 },
            count: 0,
        })
        .collect();
    for v in values {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        out[idx].count += 1;
    }

    Ok(Histogram { column: indicator, bins: out, nulls })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Row, Table};

    fn table() -> Table {
        Table::from_rows(vec![
            Row::new("A", "Europe")
                .with(Indicator::HappinessScore, 2.0)
                .with(Indicator::GdpPerCapita, 9.0),
            Row::new("B", "Asia").with(Indicator::HappinessScore, 4.0),
            Row::new("C", "Africa")
                .with(Indicator::HappinessScore, 6.0)
                .with(Indicator::GdpPerCapita, 8.0),
            Row::new("D", "Europe").with(Indicator::HappinessScore, 10.0),
            Row::new("E", "Asia"),
        ])
        .unwrap()
    }

    #[test]
    fn scatter_skips_incomplete_rows() {
        let t = table();
        let points = scatter(&t.full_view(), "gdp_per_capita", "happiness_score").unwrap();
        assert_eq!(
            points,
            vec![
                ScatterPoint { country: "A", region: "Europe", x: 9.0, y: 2.0 },
                ScatterPoint { country: "C", region: "Africa", x: 8.0, y: 6.0 },
            ]
        );
        assert!(scatter(&t.full_view(), "region", "freedom").is_err());
    }

    #[test]
    fn histogram_counts_every_value_once() {
        let t = table();
        let h = histogram(&t.full_view(), "happiness_score", 4).unwrap();
        // range 2..10, width 2
        let counts: Vec<usize> = h.bins.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 1, 1, 1]);
        assert_eq!(h.bins[0].lower, 2.0);
        assert_eq!(h.bins[3].upper, 10.0);
        assert_eq!(h.total(), 4);
        assert_eq!(h.nulls, 1);
    }

    #[test]
    fn histogram_edge_cases() {
        let t = table();
        let view = t.full_view();
        assert!(histogram(&view, "freedom", 5).unwrap().bins.is_empty());
        assert!(matches!(
            histogram(&view, "happiness_score", 0),
            Err(ExploreError::InvalidCount { what: "bins" })
        ));

        let single = Table::from_rows(vec![
            Row::new("A", "X").with(Indicator::Freedom, 0.5),
            Row::new("B", "X").with(Indicator::Freedom, 0.5),
        ])
        .unwrap();
        let h = histogram(&single.full_view(), "freedom", 10).unwrap();
        assert_eq!(h.bins, vec![Bin { lower: 0.5, upper: 0.5, count: 2 }]);
    }

    #[test]
    fn range_too_wide_for_bins_collapses_to_one_bin() {
        let t = Table::from_rows(vec![
            Row::new("A", "X").with(Indicator::Generosity, -1e308),
            Row::new("B", "X").with(Indicator::Generosity, 0.0),
            Row::new("C", "X").with(Indicator::Generosity, 1e308),
        ])
        .unwrap();
        let h = histogram(&t.full_view(), "generosity", 4).unwrap();
        assert_eq!(h.bins, vec![Bin { lower: -1e308, upper: 1e308, count: 3 }]);
    }
}
