/// Texel formats usable with buffer views and vertex input

use bitflags::bitflags;

/// Texel format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum Format {
    R8_UNORM,
    R8G8_UNORM,
    R8G8B8_UNORM,
    R8G8B8A8_UNORM,
    R16_UINT,
    R16G16_SFLOAT,
    R16G16B16A16_SFLOAT,
    R32_UINT,
    R32_SFLOAT,
    R32G32_SFLOAT,
    R32G32B32_SFLOAT,
    R32G32B32A32_SFLOAT,
}

impl Format {
    /// Size in bytes of one texel
    pub fn element_size(&self) -> u64 {
        self.component_size() * self.component_count()
    }

    /// Number of components per texel
    pub fn component_count(&self) -> u64 {
        match self {
            Format::R8_UNORM | Format::R16_UINT | Format::R32_UINT | Format::R32_SFLOAT => 1,
            Format::R8G8_UNORM | Format::R16G16_SFLOAT | Format::R32G32_SFLOAT => 2,
            Format::R8G8B8_UNORM | Format::R32G32B32_SFLOAT => 3,
            Format::R8G8B8A8_UNORM | Format::R16G16B16A16_SFLOAT | Format::R32G32B32A32_SFLOAT => 4,
        }
    }

    /// Size in bytes of one component
    pub fn component_size(&self) -> u64 {
        match self {
            Format::R8_UNORM | Format::R8G8_UNORM | Format::R8G8B8_UNORM | Format::R8G8B8A8_UNORM => 1,
            Format::R16_UINT | Format::R16G16_SFLOAT | Format::R16G16B16A16_SFLOAT => 2,
            Format::R32_UINT
            | Format::R32_SFLOAT
            | Format::R32G32_SFLOAT
            | Format::R32G32B32_SFLOAT
            | Format::R32G32B32A32_SFLOAT => 4,
        }
    }

    /// Alignment of a single texel when single-texel offset alignment applies.
    ///
    /// 3-component formats align to one component, every other format to a
    /// whole texel.
    pub fn single_texel_alignment(&self) -> u64 {
        if self.component_count() == 3 {
            self.component_size()
        } else {
            self.element_size()
        }
    }
}

bitflags! {
    /// Buffer features a format supports on the device
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FormatFeatures: u32 {
        const UNIFORM_TEXEL_BUFFER = 1 << 3;
        const STORAGE_TEXEL_BUFFER = 1 << 4;
        const VERTEX_BUFFER = 1 << 6;
    }
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod tests;
