pub mod writer_csv;

pub use writer_csv::write_csv;
