//! External file formats: the MatrixMarket dense/sparse complex matrix
//! exchange format used for both targets and persisted state.

mod matrix_market;

pub use matrix_market::{read_matrix, write_matrix};
