/// Data layer: schema, loading, filtering and the derived query engines.
///
/// Architecture:
/// ```text
///  .csv / .tsv / .json
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Table (+ LoadReport)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Table    │  Vec<Row>, immutable after load
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  FilterSpec → View (row indices into the Table)
///   └──────────┘
///        │
///        ├──────────────┬───────────────┐
///        ▼              ▼               ▼
///   ┌────────┐    ┌───────────┐    ┌────────┐
///   │  rank   │    │ correlate │    │ chart  │
///   └────────┘    └───────────┘    └────────┘
/// ```

pub mod chart;
pub mod correlate;
pub mod error;
pub mod filter;
pub mod loader;
pub mod model;
pub mod rank;
