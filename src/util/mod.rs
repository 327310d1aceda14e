pub mod coding;
pub mod collection;
pub mod comparator;
