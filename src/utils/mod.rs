// Utility module
// Helpers shared by services and the command line

pub mod common;
pub mod logger;
