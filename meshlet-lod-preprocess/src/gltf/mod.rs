mod find;
mod import;

pub use find::*;
pub use import::*;
