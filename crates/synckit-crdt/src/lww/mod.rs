mod document;

pub use document::{LwwDocument, LwwEntry};
