mod errors;
mod runner;
mod stats;

pub use errors::ScanError;
pub use runner::Scanner;
pub use stats::{FileOutcome, ScanResult};

#[cfg(test)]
mod tests;
