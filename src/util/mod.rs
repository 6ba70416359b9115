//! Implements utility functions

mod reference_data;
pub use crate::util::reference_data::*;
