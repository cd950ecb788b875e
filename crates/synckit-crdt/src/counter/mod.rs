mod pn_counter;

pub use pn_counter::PnCounter;
