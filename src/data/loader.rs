use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::error::{ExploreError, Result};
use super::model::{Column, Indicator, Row, Table};

// ---------------------------------------------------------------------------
// Options / outcome
// ---------------------------------------------------------------------------

/// Knobs for parsing a delimited source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Field delimiter byte (`b','` for CSV, `b'\t'` for TSV).
    pub delimiter: u8,
    /// Also accept the published report headers ("Ladder score", ...).
    pub accept_report_headers: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            accept_report_headers: true,
        }
    }
}

/// Diagnostics collected while loading; never fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Data records read from the source, before skipping or de-duplication.
    pub rows_read: usize,
    /// Rows dropped because `country` was blank, or `country`/`region`
    /// was not valid UTF-8.
    pub skipped_rows: usize,
    /// Non-empty numeric cells that could not be parsed (or decoded), per column.
    pub unparsable: BTreeMap<Indicator, usize>,
    /// Countries whose earlier row was replaced by a later one.
    pub duplicate_countries: Vec<String>,
}

impl LoadReport {
    pub fn total_unparsable(&self) -> usize {
        self.unparsable.values().sum()
    }
}

#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub table: Table,
    pub report: LoadReport,
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` – comma separated, header row first
/// * `.tsv` – tab separated, header row first
/// * `.json` – `[{ "country": "...", "region": "...", ...indicators }, ...]`
pub fn load_file(path: &Path) -> Result<LoadOutcome> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let file = || std::fs::File::open(path);
    match ext.as_str() {
        "csv" => load_reader(file()?, &LoadOptions::default()),
        "tsv" => load_reader(
            file()?,
            &LoadOptions {
                delimiter: b'\t',
                ..LoadOptions::default()
            },
        ),
        "json" => load_json_reader(file()?, &LoadOptions::default()),
        other => Err(ExploreError::UnsupportedFormat(other.to_string())),
    }
}

/// Load delimited text from any reader. The first record is the header.
pub fn load_reader<R: Read>(reader: R, options: &LoadOptions) -> Result<LoadOutcome> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let layout = HeaderLayout::resolve(&headers, options)?;

    // Decoded per cell; invalid UTF-8 is handled by `TableBuilder::push`.
    let mut builder = TableBuilder::default();
    for result in reader.byte_records() {
        let record = result?;
        builder.push(&layout, |idx| match record.get(idx) {
            Some(bytes) => std::str::from_utf8(bytes).ok(),
            None => Some(""),
        });
    }
    builder.finish()
}

/// Load a records-oriented JSON array, e.g. `df.to_json(orient='records')`.
pub fn load_json_reader<R: Read>(reader: R, options: &LoadOptions) -> Result<LoadOutcome> {
    let root: JsonValue = serde_json::from_reader(reader)?;
    let records = root
        .as_array()
        .ok_or_else(|| <serde_json::Error as serde::de::Error>::custom("expected top-level JSON array"))?;

    // Header = every key seen in any record, in first-seen order.
    let mut headers: Vec<String> = Vec::new();
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for rec in records {
        if let Some(obj) = rec.as_object() {
            for key in obj.keys() {
                if seen.insert(key.as_str()) {
                    headers.push(key.clone());
                }
            }
        }
    }
    let layout = HeaderLayout::resolve(&headers, options)?;

    let mut builder = TableBuilder::default();
    for rec in records {
        let cells: Vec<String> = match rec.as_object() {
            Some(obj) => headers
                .iter()
                .map(|h| obj.get(h).map(json_cell).unwrap_or_default())
                .collect(),
            None => {
                warn!("Skipping non-object JSON record");
                builder.report.rows_read += 1;
                builder.report.skipped_rows += 1;
                continue;
            }
        };
        builder.push(&layout, |idx| Some(cells[idx].as_str()));
    }
    builder.finish()
}

fn json_cell(val: &JsonValue) -> String {
    match val {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Header resolution
// ---------------------------------------------------------------------------

/// Source position of every schema column.
struct HeaderLayout {
    positions: BTreeMap<Column, usize>,
}

impl HeaderLayout {
    fn resolve(headers: &[String], options: &LoadOptions) -> Result<Self> {
        let mut positions = BTreeMap::new();
        for (idx, header) in headers.iter().enumerate() {
            let header = header.trim();
            let column = Column::ALL.into_iter().find(|c| {
                c.name() == header || (options.accept_report_headers && c.report_header() == header)
            });
            if let Some(column) = column {
                positions.entry(column).or_insert(idx);
            }
        }

        let missing: Vec<String> = Column::ALL
            .into_iter()
            .filter(|c| !positions.contains_key(c))
            .map(|c| c.name().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ExploreError::Schema { missing });
        }
        Ok(HeaderLayout { positions })
    }

    fn position(&self, column: Column) -> usize {
        self.positions[&column]
    }
}

// ---------------------------------------------------------------------------
// Row assembly
// ---------------------------------------------------------------------------

#[derive(Default)]
struct TableBuilder {
    rows: Vec<Row>,
    report: LoadReport,
}

impl TableBuilder {
    /// `cell` yields the text at a source position, or `None` when the
    /// bytes there are not valid UTF-8. Missing trailing cells are `""`.
    fn push<'c>(&mut self, layout: &HeaderLayout, cell: impl Fn(usize) -> Option<&'c str>) {
        self.report.rows_read += 1;
        let record_no = self.report.rows_read;

        let (Some(country), Some(region)) = (
            cell(layout.position(Column::Country)),
            cell(layout.position(Column::Region)),
        ) else {
            warn!("Record {record_no}: country or region is not valid UTF-8, row skipped");
            self.report.skipped_rows += 1;
            return;
        };
        let country = country.trim();
        if country.is_empty() {
            warn!("Record {record_no}: blank country, row skipped");
            self.report.skipped_rows += 1;
            return;
        }

        let mut row = Row::new(country, region.trim());
        for ind in Indicator::ALL {
            let Some(raw) = cell(layout.position(Column::Indicator(ind))) else {
                warn!("Record {record_no} ({country}): invalid UTF-8 in {ind}");
                *self.report.unparsable.entry(ind).or_default() += 1;
                continue;
            };
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            match raw.parse::<f64>() {
                Ok(v) if v.is_finite() => row.set(ind, Some(v)),
                _ => {
                    warn!("Record {record_no} ({country}): '{raw}' is not a number in {ind}");
                    *self.report.unparsable.entry(ind).or_default() += 1;
                }
            }
        }
        self.rows.push(row);
    }

    fn finish(self) -> Result<LoadOutcome> {
        let TableBuilder { rows, mut report } = self;
        let (table, duplicates) = Table::build(rows)?;
        for country in &duplicates {
            warn!("Duplicate country '{country}': later row replaces earlier one");
        }
        report.duplicate_countries = duplicates;

        info!(
            "Loaded {} rows ({} read, {} skipped, {} duplicates, {} unparsable cells)",
            table.len(),
            report.rows_read,
            report.skipped_rows,
            report.duplicate_countries.len(),
            report.total_unparsable()
        );
        Ok(LoadOutcome { table, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "country,region,happiness_score,gdp_per_capita,social_support,\
life_expectancy,freedom,generosity,corruption_perception";

    fn load(body: &str) -> Result<LoadOutcome> {
        let text = format!("{HEADER}\n{body}");
        load_reader(text.as_bytes(), &LoadOptions::default())
    }

    #[test]
    fn loads_rows_in_file_order() {
        let out = load(
            "Finland,Western Europe,7.8,10.8,0.97,71.1,0.96,-0.02,0.18\n\
             Denmark,Western Europe,7.6,10.9,0.95,71.3,0.94,0.13,0.2\n",
        )
        .unwrap();
        assert_eq!(out.table.full_view().countries(), vec!["Finland", "Denmark"]);
        assert_eq!(
            out.table.rows()[1].value(Indicator::LifeExpectancy),
            Some(71.3)
        );
        assert_eq!(out.report, LoadReport { rows_read: 2, ..LoadReport::default() });
    }

    #[test]
    fn missing_column_is_a_schema_error() {
        let text = "country,region,happiness_score\nA,X,1.0\n";
        match load_reader(text.as_bytes(), &LoadOptions::default()) {
            Err(ExploreError::Schema { missing }) => {
                assert!(missing.contains(&"gdp_per_capita".to_string()));
                assert!(!missing.contains(&"region".to_string()));
                assert_eq!(missing.len(), 6);
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn header_match_is_case_sensitive() {
        let text = HEADER.replace("freedom", "Freedom");
        let err = load_reader(format!("{text}\nA,X,1,1,1,1,1,1,1\n").as_bytes(), &LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, ExploreError::Schema { missing } if missing == vec!["freedom"]));
    }

    #[test]
    fn report_headers_are_accepted() {
        let text = "Country name,Regional indicator,Ladder score,Standard error of ladder score,\
Logged GDP per capita,Social support,Healthy life expectancy,Freedom to make life choices,\
Generosity,Perceptions of corruption\n\
Finland,Western Europe,7.804,0.036,10.792,0.969,71.150,0.961,-0.019,0.182\n";
        let out = load_reader(text.as_bytes(), &LoadOptions::default()).unwrap();
        let row = &out.table.rows()[0];
        assert_eq!(row.value(Indicator::HappinessScore), Some(7.804));
        assert_eq!(row.value(Indicator::GdpPerCapita), Some(10.792));

        let strict = LoadOptions {
            accept_report_headers: false,
            ..LoadOptions::default()
        };
        assert!(matches!(
            load_reader(text.as_bytes(), &strict),
            Err(ExploreError::Schema { .. })
        ));
    }

    #[test]
    fn bad_cells_become_null_and_are_counted() {
        let out = load(
            "A,X,abc,1.0,,1,1,1,1\n\
             B,X,2.0,n/a,0.5,1,inf,1,1\n",
        )
        .unwrap();
        let rows = out.table.rows();
        assert_eq!(rows[0].value(Indicator::HappinessScore), None);
        assert_eq!(rows[0].value(Indicator::SocialSupport), None);
        assert_eq!(rows[1].value(Indicator::Freedom), None);
        assert_eq!(out.report.unparsable.get(&Indicator::HappinessScore), Some(&1));
        assert_eq!(out.report.unparsable.get(&Indicator::GdpPerCapita), Some(&1));
        assert_eq!(out.report.unparsable.get(&Indicator::Freedom), Some(&1));
        // blank cell is absent, not unparsable
        assert_eq!(out.report.unparsable.get(&Indicator::SocialSupport), None);
        assert_eq!(out.report.total_unparsable(), 3);
    }

    #[test]
    fn invalid_utf8_cells_do_not_abort_the_load() {
        let mut bytes = format!("{HEADER}\n").into_bytes();
        bytes.extend_from_slice(b"A,X,1,1,1,1,1,1,1\n");
        bytes.extend_from_slice(b"B,X,\xff\xfe,1,1,1,1,1,1\n");
        bytes.extend_from_slice(b"\xc3(,X,2,1,1,1,1,1,1\n");
        bytes.extend_from_slice(b"C,\xe2\x82,3,1,1,1,1,1,1\n");

        let out = load_reader(bytes.as_slice(), &LoadOptions::default()).unwrap();
        assert_eq!(out.table.full_view().countries(), vec!["A", "B"]);
        assert_eq!(out.table.rows()[1].value(Indicator::HappinessScore), None);
        assert_eq!(out.table.rows()[1].value(Indicator::GdpPerCapita), Some(1.0));
        assert_eq!(out.report.unparsable.get(&Indicator::HappinessScore), Some(&1));
        assert_eq!(out.report.total_unparsable(), 1);
        assert_eq!(out.report.rows_read, 4);
        assert_eq!(out.report.skipped_rows, 2);
    }

    #[test]
    fn negative_zero_loads_as_zero() {
        let out = load("A,X,1,1,1,1,1,-0.0,1\n").unwrap();
        let value = out.table.rows()[0].value(Indicator::Generosity).unwrap();
        assert_eq!(value, 0.0);
        assert!(value.is_sign_positive());
    }

    #[test]
    fn short_rows_are_padded_with_nulls() {
        let out = load("A,X,5.0\n").unwrap();
        let row = &out.table.rows()[0];
        assert_eq!(row.value(Indicator::HappinessScore), Some(5.0));
        assert_eq!(row.value(Indicator::CorruptionPerception), None);
    }

    #[test]
    fn duplicates_and_blank_countries_are_reported() {
        let out = load(
            "A,X,1,,,,,,\n\
             ,X,2,,,,,,\n\
             B,Y,3,,,,,,\n\
             A,Z,4,,,,,,\n",
        )
        .unwrap();
        assert_eq!(out.table.full_view().countries(), vec!["B", "A"]);
        assert_eq!(out.table.rows()[1].value(Indicator::HappinessScore), Some(4.0));
        assert_eq!(out.report.rows_read, 4);
        assert_eq!(out.report.skipped_rows, 1);
        assert_eq!(out.report.duplicate_countries, vec!["A".to_string()]);
    }

    #[test]
    fn header_only_file_is_empty() {
        assert!(matches!(load(""), Err(ExploreError::EmptyDataset)));
        assert!(matches!(load(",X,1,,,,,,\n"), Err(ExploreError::EmptyDataset)));
    }

    #[test]
    fn tab_delimited_input() {
        let text = format!("{}\nA\tX\t1\t2\t3\t4\t5\t6\t7\n", HEADER.replace(',', "\t"));
        let opts = LoadOptions {
            delimiter: b'\t',
            ..LoadOptions::default()
        };
        let out = load_reader(text.as_bytes(), &opts).unwrap();
        assert_eq!(out.table.rows()[0].value(Indicator::CorruptionPerception), Some(7.0));
    }

    #[test]
    fn json_records_load() {
        let text = r#"[
            {"country": "A", "region": "X", "happiness_score": 6.5, "gdp_per_capita": "9.1",
             "social_support": null, "life_expectancy": 70, "freedom": true,
             "generosity": 0.1, "corruption_perception": 0.4},
            {"country": "B", "region": "Y", "happiness_score": 4.0}
        ]"#;
        let out = load_json_reader(text.as_bytes(), &LoadOptions::default()).unwrap();
        let rows = out.table.rows();
        assert_eq!(rows[0].value(Indicator::HappinessScore), Some(6.5));
        assert_eq!(rows[0].value(Indicator::GdpPerCapita), Some(9.1));
        assert_eq!(rows[0].value(Indicator::SocialSupport), None);
        assert_eq!(rows[0].value(Indicator::LifeExpectancy), Some(70.0));
        assert_eq!(rows[0].value(Indicator::Freedom), None);
        assert_eq!(rows[1].value(Indicator::Generosity), None);
        assert_eq!(out.report.unparsable.get(&Indicator::Freedom), Some(&1));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: LoadOptions = serde_json::from_str(r#"{"delimiter": 59}"#).unwrap();
        assert_eq!(opts.delimiter, b';');
        assert!(opts.accept_report_headers);
    }
}
