pub mod csv_history;

pub use csv_history::CsvHistoryProvider;
