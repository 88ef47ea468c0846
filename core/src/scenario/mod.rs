pub mod facade;
pub mod report;
pub mod tables;

pub use facade::{RetrospectiveOptions, RetrospectiveReport, Scenario};
pub use report::{RenderHints, ReportSink};
pub use tables::{DescribeRow, HistoryRow, HistoryTable, HistoryTarget, SummaryRow, TrackRow};
