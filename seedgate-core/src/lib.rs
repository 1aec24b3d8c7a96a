pub mod error;
pub mod error_utils;
pub mod settings;
pub mod traits;
pub mod types;

pub use error::*;
pub use error_utils::*;
pub use settings::*;
pub use traits::*;
pub use types::*;
