//! Query core for the World Happiness Report explorer.
//!
//! Load the table once, then derive filtered views, rankings, correlation
//! matrices and chart series from it. Every query is a pure function of its
//! arguments and the immutable base [`Table`].

pub mod data;
pub mod session;

pub use data::chart::{histogram, scatter, Bin, Histogram, ScatterPoint};
pub use data::correlate::{correlate, correlate_all, Cell, CorrelationMatrix, UndefinedReason};
pub use data::error::{ExploreError, Result};
pub use data::filter::{apply, complete_cases, Constraint, FilterSpec};
pub use data::loader::{load_file, load_json_reader, load_reader, LoadOptions, LoadOutcome, LoadReport};
pub use data::model::{Column, Indicator, Row, Table, View};
pub use data::rank::{bottom_n, top_n, Direction, RankedRow, RankingResult};
pub use session::Explorer;
