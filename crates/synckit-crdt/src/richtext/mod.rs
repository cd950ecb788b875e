mod peritext;

pub use peritext::{Anchor, AnchorSide, RichText};
