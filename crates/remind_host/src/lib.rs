pub mod alarmd;
pub mod platform;
pub mod sequence;
pub mod shade;
pub mod store;

pub use crate::alarmd::{AlarmDaemon, FireMode};
pub use crate::platform::{DesktopPlatform, ShadeEntry};
pub use crate::sequence::FileSequence;
pub use crate::shade::Shade;
pub use crate::store::HostPaths;
