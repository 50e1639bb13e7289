/// Device capability table
///
/// Limits, feature booleans, queue families and format support reported by
/// the device. Supplied once when the layer is created and never rediscovered
/// per call.

use rustc_hash::FxHashMap;
use crate::error::Result;
use crate::layer_bail;
use crate::device::command::QueueFlags;
use crate::device::format::{Format, FormatFeatures};

/// Numeric device limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    /// Offset alignment of texel buffer views without texel buffer alignment
    pub min_texel_buffer_offset_alignment: u64,
    /// Maximum number of texels addressable through one buffer view
    pub max_texel_buffer_elements: u64,
    pub max_vertex_input_bindings: u32,
    pub min_uniform_buffer_offset_alignment: u64,
    pub min_storage_buffer_offset_alignment: u64,
    /// Base alignment of every buffer memory binding
    pub buffer_memory_alignment: u64,
    /// Maximum buffer size, when the device reports one
    pub max_buffer_size: Option<u64>,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            min_texel_buffer_offset_alignment: 16,
            max_texel_buffer_elements: 65536,
            max_vertex_input_bindings: 16,
            min_uniform_buffer_offset_alignment: 64,
            min_storage_buffer_offset_alignment: 16,
            buffer_memory_alignment: 16,
            max_buffer_size: None,
        }
    }
}

/// Texel buffer alignment properties, used when the
/// `texel_buffer_alignment` feature is enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TexelBufferAlignment {
    pub storage_offset_alignment_bytes: u64,
    pub storage_offset_single_texel_alignment: bool,
    pub uniform_offset_alignment_bytes: u64,
    pub uniform_offset_single_texel_alignment: bool,
}

impl Default for TexelBufferAlignment {
    fn default() -> Self {
        Self {
            storage_offset_alignment_bytes: 16,
            storage_offset_single_texel_alignment: true,
            uniform_offset_alignment_bytes: 16,
            uniform_offset_single_texel_alignment: false,
        }
    }
}

/// Optional features negotiated at device creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceFeatures {
    pub index_type_uint8: bool,
    pub texel_buffer_alignment: bool,
    pub maintenance1: bool,
    pub maintenance4: bool,
    pub maintenance5: bool,
    pub conditional_rendering: bool,
    pub sparse_binding: bool,
    pub dedicated_allocation: bool,
    pub copy_commands2: bool,
}

impl DeviceFeatures {
    /// Every optional feature enabled
    pub fn all() -> Self {
        Self {
            index_type_uint8: true,
            texel_buffer_alignment: true,
            maintenance1: true,
            maintenance4: true,
            maintenance5: true,
            conditional_rendering: true,
            sparse_binding: true,
            dedicated_allocation: true,
            copy_commands2: true,
        }
    }
}

/// Immutable capability table
#[derive(Debug, Clone)]
pub struct Capabilities {
    pub limits: DeviceLimits,
    pub texel_alignment: TexelBufferAlignment,
    pub features: DeviceFeatures,
    /// Supported operations per queue family index
    pub queue_families: Vec<QueueFlags>,
    /// Buffer features per format; missing formats support nothing
    pub formats: FxHashMap<Format, FormatFeatures>,
}

impl Default for Capabilities {
    fn default() -> Self {
        let uniform = FormatFeatures::UNIFORM_TEXEL_BUFFER;
        let both = FormatFeatures::UNIFORM_TEXEL_BUFFER | FormatFeatures::STORAGE_TEXEL_BUFFER;
        let vertex = FormatFeatures::VERTEX_BUFFER;

        let mut formats = FxHashMap::default();
        formats.insert(Format::R8_UNORM, both | vertex);
        formats.insert(Format::R8G8_UNORM, both | vertex);
        formats.insert(Format::R8G8B8_UNORM, vertex);
        formats.insert(Format::R8G8B8A8_UNORM, both | vertex);
        formats.insert(Format::R16_UINT, both | vertex);
        formats.insert(Format::R16G16_SFLOAT, both | vertex);
        formats.insert(Format::R16G16B16A16_SFLOAT, both | vertex);
        formats.insert(Format::R32_UINT, both | vertex);
        formats.insert(Format::R32_SFLOAT, both | vertex);
        formats.insert(Format::R32G32_SFLOAT, both | vertex);
        formats.insert(Format::R32G32B32_SFLOAT, uniform | vertex);
        formats.insert(Format::R32G32B32A32_SFLOAT, both | vertex);

        Self {
            limits: DeviceLimits::default(),
            texel_alignment: TexelBufferAlignment::default(),
            features: DeviceFeatures::default(),
            queue_families: vec![
                QueueFlags::GRAPHICS | QueueFlags::COMPUTE | QueueFlags::TRANSFER | QueueFlags::SPARSE_BINDING,
                QueueFlags::TRANSFER,
            ],
            formats,
        }
    }
}

impl Capabilities {
    pub fn with_features(mut self, features: DeviceFeatures) -> Self {
        self.features = features;
        self
    }

    pub fn with_limits(mut self, limits: DeviceLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_texel_alignment(mut self, texel_alignment: TexelBufferAlignment) -> Self {
        self.texel_alignment = texel_alignment;
        self
    }

    pub fn with_queue_families(mut self, queue_families: Vec<QueueFlags>) -> Self {
        self.queue_families = queue_families;
        self
    }

    /// Buffer features of a format (empty when the format is unsupported)
    pub fn format_features(&self, format: Format) -> FormatFeatures {
        self.formats.get(&format).copied().unwrap_or(FormatFeatures::empty())
    }

    /// Operations supported by a queue family, if it exists
    pub fn queue_flags(&self, family_index: u32) -> Option<QueueFlags> {
        self.queue_families.get(family_index as usize).copied()
    }

    /// Reject internally inconsistent tables
    pub fn validate(&self) -> Result<()> {
        const SOURCE: &str = "galaxy3d::validation::Capabilities";

        let alignments = [
            ("min_texel_buffer_offset_alignment", self.limits.min_texel_buffer_offset_alignment),
            ("min_uniform_buffer_offset_alignment", self.limits.min_uniform_buffer_offset_alignment),
            ("min_storage_buffer_offset_alignment", self.limits.min_storage_buffer_offset_alignment),
            ("buffer_memory_alignment", self.limits.buffer_memory_alignment),
            ("storage_offset_alignment_bytes", self.texel_alignment.storage_offset_alignment_bytes),
            ("uniform_offset_alignment_bytes", self.texel_alignment.uniform_offset_alignment_bytes),
        ];
        for (name, value) in alignments {
            if !value.is_power_of_two() {
                layer_bail!(InitializationFailed, SOURCE,
                    "{} must be a non-zero power of two (got {})", name, value);
            }
        }

        if self.limits.max_texel_buffer_elements == 0 {
            layer_bail!(InitializationFailed, SOURCE, "max_texel_buffer_elements must not be 0");
        }

        if self.limits.max_buffer_size == Some(0) {
            layer_bail!(InitializationFailed, SOURCE, "max_buffer_size must not be 0");
        }

        if self.queue_families.is_empty() {
            layer_bail!(InitializationFailed, SOURCE, "capability table has no queue families");
        }

        if let Some(index) = self.queue_families.iter().position(|flags| flags.is_empty()) {
            layer_bail!(InitializationFailed, SOURCE,
                "queue family {} supports no operation", index);
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "capabilities_tests.rs"]
mod tests;
