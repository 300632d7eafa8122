pub mod label;
pub mod util;
