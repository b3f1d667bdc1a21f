//! Readers for each dataset family. Every loader returns a typed polars
//! frame keyed the way the downstream joins expect.

pub mod housing;
pub mod income;
pub mod lihs;

pub use housing::{load_cpi_increases, load_dwellings, load_rent};
pub use income::load_income;
pub use lihs::{aedc_for_year, load_aedc_long, load_lihs_data, load_lihs_files};
