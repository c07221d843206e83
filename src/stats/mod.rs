pub mod percentile;

pub use percentile::{median, percentile, summarize, Summary};
