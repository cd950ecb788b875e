mod fugue;

pub use fugue::{Origin, TextCrdt};
