pub mod confirmation;
pub mod errors;
pub mod telemetry;
pub mod types;
pub mod utils;
