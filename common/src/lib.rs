pub mod dashboard;
pub mod data;
pub mod payloads;
pub mod status;
pub mod tree;

pub use status::{label_for, parse_status, progress_for, ParsedStatus, StatusTable};
