/// Helpers shared by rule families

use crate::registry::{BufferKey, BufferRecord, HandleRef};
use crate::rules::rule::Env;

/// Display form of a buffer handle
pub(crate) fn buffer_name(key: BufferKey) -> String {
    HandleRef::Buffer(key).to_string()
}

/// Whether a buffer is bound to memory that is still alive
pub(crate) fn has_live_memory(env: &Env<'_>, buffer: &BufferRecord) -> bool {
    env.registry.bound_memory(buffer).is_some()
}

/// Message for a buffer used without live memory
pub(crate) fn no_memory_message(key: BufferKey, buffer: &BufferRecord, env: &Env<'_>) -> String {
    if env.registry.bound_to_freed_memory(buffer) {
        format!("{} is bound to a VkDeviceMemory that has been freed.", buffer_name(key))
    } else {
        format!(
            "{} used with no memory bound. Memory should be bound by calling vkBindBufferMemory().",
            buffer_name(key)
        )
    }
}

/// Transfer commands are only valid outside a render pass
pub(crate) fn check_outside_render_pass(env: &Env<'_>, out: &mut Vec<String>) {
    if env.command_buffer.is_some_and(|state| state.render_pass_active) {
        out.push(format!("{} must only be called outside of a render pass instance.", env.shape.name()));
    }
}
