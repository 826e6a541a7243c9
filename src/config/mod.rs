pub mod fields;
pub mod settings;
