pub mod import;
pub mod intake;
