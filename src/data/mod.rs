pub mod csv;
pub mod dataset;
