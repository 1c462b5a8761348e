pub mod domain;
pub mod field_model;
pub mod parse;
