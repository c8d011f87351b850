//! Domain models: the frame value map and the static option registry.

pub mod frame;
pub mod registry;

pub use frame::{Frame, Value};
pub use registry::{HardwareType, MessageType, Mode, OptionDef};
