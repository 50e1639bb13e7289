/// Dynamic state driven by intercepted calls

pub mod binding;
pub mod command_buffer;

pub use binding::BindingState;
pub use command_buffer::{CommandBufferState, RecordingState};
