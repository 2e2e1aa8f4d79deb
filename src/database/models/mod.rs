pub mod member;
pub mod subscription;
pub mod delivery;

pub use member::*;
pub use subscription::*;
pub use delivery::*;
