pub mod asset;
pub mod defect;
pub mod issue;
