pub mod lint;
pub mod version;
