//! Shader variable types and std140 layout

use bitflags::bitflags;

/// Array size of a variable that is not an array
pub const NON_ARRAY: u32 = 0;

bitflags! {
    /// Shader stages a uniform is visible to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderFlags: u32 {
        /// Vertex stage
        const VERTEX = 0x1;
        /// Fragment stage
        const FRAGMENT = 0x2;
    }
}

/// Shading language types used by fragment stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlType {
    /// `float`
    Float,
    /// `vec2`
    Float2,
    /// `vec3`
    Float3,
    /// `vec4`
    Float4,
    /// `mat2`
    Float2x2,
    /// `mat3`
    Float3x3,
    /// `mat4`
    Float4x4,
    /// `int`
    Int,
    /// `ivec2`
    Int2,
    /// `ivec4`
    Int4,
    /// `sampler2D`
    Sampler2D,
}

impl SlType {
    /// Type name in generated source
    pub fn name(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Float2 => "vec2",
            Self::Float3 => "vec3",
            Self::Float4 => "vec4",
            Self::Float2x2 => "mat2",
            Self::Float3x3 => "mat3",
            Self::Float4x4 => "mat4",
            Self::Int => "int",
            Self::Int2 => "ivec2",
            Self::Int4 => "ivec4",
            Self::Sampler2D => "sampler2D",
        }
    }

    /// Whether this is an opaque sampler type
    pub fn is_sampler(self) -> bool {
        matches!(self, Self::Sampler2D)
    }

    /// Number of 4-byte components, matrices counted unpadded
    pub fn component_count(self) -> u32 {
        match self {
            Self::Float | Self::Int => 1,
            Self::Float2 | Self::Int2 => 2,
            Self::Float3 => 3,
            Self::Float4 | Self::Int4 | Self::Float2x2 => 4,
            Self::Float3x3 => 9,
            Self::Float4x4 => 16,
            Self::Sampler2D => 0,
        }
    }

    /// (columns, rows) for matrix types
    pub fn matrix_dims(self) -> Option<(u32, u32)> {
        match self {
            Self::Float2x2 => Some((2, 2)),
            Self::Float3x3 => Some((3, 3)),
            Self::Float4x4 => Some((4, 4)),
            _ => None,
        }
    }

    /// std140 base alignment of a single (non-array) value
    pub fn std140_alignment(self) -> u32 {
        match self {
            Self::Float | Self::Int => 4,
            Self::Float2 | Self::Int2 => 8,
            Self::Float3 | Self::Float4 | Self::Int4 => 16,
            // matrix columns are vec4-aligned
            Self::Float2x2 | Self::Float3x3 | Self::Float4x4 => 16,
            Self::Sampler2D => 0,
        }
    }

    /// std140 size of a single (non-array) value
    pub fn std140_size(self) -> u32 {
        match self {
            Self::Float | Self::Int => 4,
            Self::Float2 | Self::Int2 => 8,
            Self::Float3 => 12,
            Self::Float4 | Self::Int4 => 16,
            Self::Float2x2 => 32,
            Self::Float3x3 => 48,
            Self::Float4x4 => 64,
            Self::Sampler2D => 0,
        }
    }
}

/// Round `offset` up to a multiple of `alignment`
pub const fn align_to(offset: u32, alignment: u32) -> u32 {
    if alignment == 0 {
        offset
    } else {
        offset.div_ceil(alignment) * alignment
    }
}

/// std140 (alignment, size) of a possibly-array variable
///
/// Array elements are padded to 16 bytes each.
pub fn std140_layout(ty: SlType, array_size: u32) -> (u32, u32) {
    if array_size == NON_ARRAY {
        (ty.std140_alignment(), ty.std140_size())
    } else {
        let stride = align_to(ty.std140_size(), 16);
        (16, stride * array_size)
    }
}

/// A typed, named shader variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderVar {
    /// Type
    pub ty: SlType,
    /// Name as it appears in source
    pub name: String,
    /// Element count, [`NON_ARRAY`] for a plain value
    pub array_size: u32,
}

impl ShaderVar {
    /// New variable
    pub fn new(ty: SlType, name: impl Into<String>, array_size: u32) -> Self {
        Self {
            ty,
            name: name.into(),
            array_size,
        }
    }

    /// Declaration without qualifiers or trailing semicolon
    pub fn declaration(&self) -> String {
        if self.array_size == NON_ARRAY {
            format!("{} {}", self.ty.name(), self.name)
        } else {
            format!("{} {}[{}]", self.ty.name(), self.name, self.array_size)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_std140_arrays_pad_elements() {
        assert_eq!(std140_layout(SlType::Float, NON_ARRAY), (4, 4));
        assert_eq!(std140_layout(SlType::Float, 4), (16, 64));
        assert_eq!(std140_layout(SlType::Float4, 8), (16, 128));
        assert_eq!(std140_layout(SlType::Float3x3, NON_ARRAY), (16, 48));
    }

    #[test]
    fn test_declaration() {
        assert_eq!(ShaderVar::new(SlType::Float4, "color_2", NON_ARRAY).declaration(), "vec4 color_2");
        assert_eq!(ShaderVar::new(SlType::Float4, "colors_0", 8).declaration(), "vec4 colors_0[8]");
    }

    #[test]
    fn test_align_to() {
        assert_eq!(align_to(0, 16), 0);
        assert_eq!(align_to(4, 16), 16);
        assert_eq!(align_to(20, 8), 24);
        assert_eq!(align_to(7, 0), 7);
    }
}
