//! openSUSE Leap and Tumbleweed Minimal-VM cloud images.

pub mod leap;
pub mod tumbleweed;

pub use leap::Leap;
pub use tumbleweed::Tumbleweed;

const MINIMAL_VM: &str = "Minimal-VM";
