use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use super::error::{ExploreError, Result};

// ---------------------------------------------------------------------------
// Indicator / Column – the fixed schema
// ---------------------------------------------------------------------------

/// The numeric indicator columns, in header order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    HappinessScore,
    GdpPerCapita,
    SocialSupport,
    LifeExpectancy,
    Freedom,
    Generosity,
    CorruptionPerception,
}

impl Indicator {
    pub const ALL: [Indicator; 7] = [
        Indicator::HappinessScore,
        Indicator::GdpPerCapita,
        Indicator::SocialSupport,
        Indicator::LifeExpectancy,
        Indicator::Freedom,
        Indicator::Generosity,
        Indicator::CorruptionPerception,
    ];

    /// Canonical column name.
    pub fn name(self) -> &'static str {
        match self {
            Indicator::HappinessScore => "happiness_score",
            Indicator::GdpPerCapita => "gdp_per_capita",
            Indicator::SocialSupport => "social_support",
            Indicator::LifeExpectancy => "life_expectancy",
            Indicator::Freedom => "freedom",
            Indicator::Generosity => "generosity",
            Indicator::CorruptionPerception => "corruption_perception",
        }
    }

    /// Header used by the published WHR 2023 file.
    pub fn report_header(self) -> &'static str {
        match self {
            Indicator::HappinessScore => "Ladder score",
            Indicator::GdpPerCapita => "Logged GDP per capita",
            Indicator::SocialSupport => "Social support",
            Indicator::LifeExpectancy => "Healthy life expectancy",
            Indicator::Freedom => "Freedom to make life choices",
            Indicator::Generosity => "Generosity",
            Indicator::CorruptionPerception => "Perceptions of corruption",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Any column of the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    Country,
    Region,
    Indicator(Indicator),
}

impl Column {
    pub const ALL: [Column; 9] = [
        Column::Country,
        Column::Region,
        Column::Indicator(Indicator::HappinessScore),
        Column::Indicator(Indicator::GdpPerCapita),
        Column::Indicator(Indicator::SocialSupport),
        Column::Indicator(Indicator::LifeExpectancy),
        Column::Indicator(Indicator::Freedom),
        Column::Indicator(Indicator::Generosity),
        Column::Indicator(Indicator::CorruptionPerception),
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::Country => "country",
            Column::Region => "region",
            Column::Indicator(ind) => ind.name(),
        }
    }

    pub fn report_header(self) -> &'static str {
        match self {
            Column::Country => "Country name",
            Column::Region => "Regional indicator",
            Column::Indicator(ind) => ind.report_header(),
        }
    }

    /// Resolve a canonical column name. Case-sensitive.
    pub fn from_name(name: &str) -> Option<Column> {
        Column::ALL.into_iter().find(|c| c.name() == name)
    }

    pub fn as_indicator(self) -> Option<Indicator> {
        match self {
            Column::Indicator(ind) => Some(ind),
            _ => None,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolve `name` to a numeric column or fail with `InvalidColumn`.
pub fn resolve_indicator(name: &str) -> Result<Indicator> {
    match Column::from_name(name) {
        Some(Column::Indicator(ind)) => Ok(ind),
        Some(_) => Err(ExploreError::invalid_column(name, "column is not numeric")),
        None => Err(ExploreError::invalid_column(name, "no such column")),
    }
}

// ---------------------------------------------------------------------------
// Row – one country observation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub country: String,
    pub region: String,
    values: [Option<f64>; 7],
}

impl Row {
    pub fn new(country: impl Into<String>, region: impl Into<String>) -> Self {
        Row {
            country: country.into(),
            region: region.into(),
            values: [None; 7],
        }
    }

    /// Builder-style setter. Non-finite values are stored as null.
    pub fn with(mut self, indicator: Indicator, value: f64) -> Self {
        self.set(indicator, Some(value));
        self
    }

    /// Non-finite values become null; `-0.0` is stored as `0.0`.
    pub fn set(&mut self, indicator: Indicator, value: Option<f64>) {
        self.values[indicator.index()] = value
            .filter(|v| v.is_finite())
            .map(|v| if v == 0.0 { 0.0 } else { v });
    }

    pub fn value(&self, indicator: Indicator) -> Option<f64> {
        self.values[indicator.index()]
    }

    /// Text value for `country` / `region`; `None` for indicators.
    pub fn text(&self, column: Column) -> Option<&str> {
        match column {
            Column::Country => Some(self.country.as_str()),
            Column::Region => Some(self.region.as_str()),
            Column::Indicator(_) => None,
        }
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Column::ALL.len()))?;
        map.serialize_entry(Column::Country.name(), &self.country)?;
        map.serialize_entry(Column::Region.name(), &self.region)?;
        for ind in Indicator::ALL {
            map.serialize_entry(ind.name(), &self.value(ind))?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Table – the immutable base dataset
// ---------------------------------------------------------------------------

/// Ordered rows with unique `country` values.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    rows: Vec<Row>,
}

impl Table {
    /// Build a table; a repeated country replaces its earlier row.
    pub fn from_rows(rows: Vec<Row>) -> Result<Self> {
        Self::build(rows).map(|(table, _)| table)
    }

    /// Like [`Table::from_rows`] but also returns the superseded countries.
    pub(crate) fn build(rows: Vec<Row>) -> Result<(Self, Vec<String>)> {
        let mut slots: Vec<Option<Row>> = Vec::with_capacity(rows.len());
        let mut position: HashMap<String, usize> = HashMap::with_capacity(rows.len());
        let mut duplicates = Vec::new();

        for row in rows {
            if let Some(prev) = position.insert(row.country.clone(), slots.len()) {
                slots[prev] = None;
                duplicates.push(row.country.clone());
            }
            slots.push(Some(row));
        }

        let rows: Vec<Row> = slots.into_iter().flatten().collect();
        if rows.is_empty() {
            return Err(ExploreError::EmptyDataset);
        }
        Ok((Table { rows }, duplicates))
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// A view over every row, in table order.
    pub fn full_view(&self) -> View<'_> {
        View::from_indices(self, (0..self.rows.len()).collect())
    }

    /// Sorted distinct region labels.
    pub fn regions(&self) -> BTreeSet<&str> {
        self.rows.iter().map(|r| r.region.as_str()).collect()
    }

    /// `(min, max)` over the non-null values of `indicator`.
    pub fn range(&self, indicator: Indicator) -> Option<(f64, f64)> {
        self.rows
            .iter()
            .filter_map(|r| r.value(indicator))
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

// ---------------------------------------------------------------------------
// View – a read-only subset of a Table
// ---------------------------------------------------------------------------

/// Row indices into a borrowed [`Table`], in table order.
#[derive(Debug, Clone, PartialEq)]
pub struct View<'a> {
    table: &'a Table,
    indices: Vec<usize>,
}

impl<'a> View<'a> {
    pub(crate) fn from_indices(table: &'a Table, indices: Vec<usize>) -> Self {
        View { table, indices }
    }

    pub fn table(&self) -> &'a Table {
        self.table
    }

    /// Positions of the selected rows in the base table.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &'a Row> + '_ {
        let rows = self.table.rows();
        self.indices.iter().map(move |&i| &rows[i])
    }

    pub fn countries(&self) -> Vec<&'a str> {
        self.rows().map(|r| r.country.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_names_resolve_case_sensitively() {
        assert_eq!(Column::from_name("region"), Some(Column::Region));
        assert_eq!(
            Column::from_name("freedom"),
            Some(Column::Indicator(Indicator::Freedom))
        );
        assert_eq!(Column::from_name("Region"), None);
        assert_eq!(Column::from_name("corruption"), None);
    }

    #[test]
    fn resolve_indicator_rejects_text_and_unknown_columns() {
        assert_eq!(
            resolve_indicator("generosity").unwrap(),
            Indicator::Generosity
        );
        assert!(matches!(
            resolve_indicator("country"),
            Err(ExploreError::InvalidColumn { .. })
        ));
        assert!(matches!(
            resolve_indicator("gdp"),
            Err(ExploreError::InvalidColumn { .. })
        ));
    }

    #[test]
    fn non_finite_values_are_stored_as_null() {
        let row = Row::new("A", "X")
            .with(Indicator::Freedom, f64::NAN)
            .with(Indicator::Generosity, 0.25);
        assert_eq!(row.value(Indicator::Freedom), None);
        assert_eq!(row.value(Indicator::Generosity), Some(0.25));
    }

    #[test]
    fn negative_zero_is_stored_as_zero() {
        let row = Row::new("A", "X").with(Indicator::Generosity, -0.0);
        let value = row.value(Indicator::Generosity).unwrap();
        assert!(value.is_sign_positive());
        assert_eq!(value.to_bits(), 0.0f64.to_bits());
    }

    #[test]
    fn later_duplicate_replaces_earlier_row() {
        let rows = vec![
            Row::new("A", "X").with(Indicator::HappinessScore, 1.0),
            Row::new("B", "X"),
            Row::new("A", "Y").with(Indicator::HappinessScore, 2.0),
        ];
        let (table, dups) = Table::build(rows).unwrap();
        assert_eq!(dups, vec!["A".to_string()]);
        assert_eq!(table.full_view().countries(), vec!["B", "A"]);
        assert_eq!(table.rows()[1].region, "Y");
    }

    #[test]
    fn empty_table_is_rejected() {
        assert!(matches!(
            Table::from_rows(Vec::new()),
            Err(ExploreError::EmptyDataset)
        ));
    }

    #[test]
    fn regions_and_ranges() {
        let table = Table::from_rows(vec![
            Row::new("A", "Europe").with(Indicator::Freedom, 0.5),
            Row::new("B", "Africa").with(Indicator::Freedom, 0.9),
            Row::new("C", "Europe"),
        ])
        .unwrap();
        assert_eq!(
            table.regions().into_iter().collect::<Vec<_>>(),
            vec!["Africa", "Europe"]
        );
        assert_eq!(table.range(Indicator::Freedom), Some((0.5, 0.9)));
        assert_eq!(table.range(Indicator::Generosity), None);
    }

    #[test]
    fn row_serializes_as_flat_record() {
        let row = Row::new("Finland", "Western Europe").with(Indicator::HappinessScore, 7.8);
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["country"], "Finland");
        assert_eq!(json["happiness_score"], 7.8);
        assert!(json["freedom"].is_null());
    }
}
