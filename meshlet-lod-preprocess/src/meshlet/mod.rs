pub mod error;
pub mod export;
pub mod preprocess;
pub mod process;
