mod fractional_index;

pub use fractional_index::{FractionalIndex, FractionalList};
