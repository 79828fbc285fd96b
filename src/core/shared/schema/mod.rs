pub mod catalog;
pub use self::catalog::*;
