pub mod caller;
pub mod hosted;
pub mod memory;
pub mod postgres;
pub mod traits;

pub use caller::{act_as, acting_token};
pub use traits::Storage;
