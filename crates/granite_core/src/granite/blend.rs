//! Blend modes
//!
//! The enumeration is generated from one list, so [`BlendMode::COUNT`], the
//! ordinals and [`BlendMode::ALL`] cannot drift apart. Fixed blend stage IDs
//! are derived from the ordinal; appending a mode here extends that ID range
//! with no other edits.

/// A set of blend modes that fixed blend stages can be derived from
///
/// Implemented by [`BlendMode`]. Tests implement it on larger enumerations to
/// check that the derived stage ID range grows with the mode count.
pub trait BlendModeSet: Copy + std::fmt::Debug + 'static {
    /// Number of modes
    const COUNT: usize;

    /// Position of this mode, `0..COUNT`
    fn ordinal(self) -> usize;

    /// Mode at `ordinal`
    fn from_ordinal(ordinal: usize) -> Option<Self>;

    /// Display name
    fn name(self) -> &'static str;
}

macro_rules! blend_modes {
    ($($variant:ident => $name:literal,)*) => {
        /// Ways of combining a source color with a destination color
        ///
        /// Porter-Duff modes come first, followed by the separable and then
        /// the non-separable advanced modes.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum BlendMode {
            $(
                #[doc = $name]
                $variant,
            )*
        }

        impl BlendMode {
            /// Every mode in ordinal order
            pub const ALL: &'static [Self] = &[$(Self::$variant,)*];

            /// Number of modes
            pub const COUNT: usize = Self::ALL.len();

            /// Display name
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }
        }
    };
}

blend_modes! {
    Clear => "CLEAR",
    Src => "SRC",
    Dst => "DST",
    SrcOver => "SRC_OVER",
    DstOver => "DST_OVER",
    SrcIn => "SRC_IN",
    DstIn => "DST_IN",
    SrcOut => "SRC_OUT",
    DstOut => "DST_OUT",
    SrcAtop => "SRC_ATOP",
    DstAtop => "DST_ATOP",
    Xor => "XOR",
    Plus => "PLUS",
    PlusClamped => "PLUS_CLAMPED",
    Minus => "MINUS",
    MinusClamped => "MINUS_CLAMPED",
    Modulate => "MODULATE",
    Multiply => "MULTIPLY",
    Screen => "SCREEN",
    Overlay => "OVERLAY",
    Darken => "DARKEN",
    Lighten => "LIGHTEN",
    ColorDodge => "COLOR_DODGE",
    ColorBurn => "COLOR_BURN",
    HardLight => "HARD_LIGHT",
    SoftLight => "SOFT_LIGHT",
    Difference => "DIFFERENCE",
    Exclusion => "EXCLUSION",
    Subtract => "SUBTRACT",
    Divide => "DIVIDE",
    LinearDodge => "LINEAR_DODGE",
    LinearBurn => "LINEAR_BURN",
    VividLight => "VIVID_LIGHT",
    LinearLight => "LINEAR_LIGHT",
    PinLight => "PIN_LIGHT",
    HardMix => "HARD_MIX",
    DarkerColor => "DARKER_COLOR",
    LighterColor => "LIGHTER_COLOR",
    Hue => "HUE",
    Saturation => "SATURATION",
    Color => "COLOR",
    Luminosity => "LUMINOSITY",
}

impl BlendMode {
    /// Default paint blend mode
    pub const DEFAULT: Self = Self::SrcOver;

    /// Position in [`BlendMode::ALL`]
    pub const fn ordinal(self) -> usize {
        self as usize
    }

    /// Mode at `ordinal`
    pub fn from_ordinal(ordinal: usize) -> Option<Self> {
        Self::ALL.get(ordinal).copied()
    }

    /// Whether the mode is expressible with Porter-Duff coefficients
    pub fn is_porter_duff(self) -> bool {
        self.porter_duff_coefficients().is_some()
    }

    /// `[src_coeff, dst_coeff, src_alpha_term, dst_alpha_term]` for
    /// `result = src * (k0 + k2 * dst.a) + dst * (k1 + k3 * src.a)`
    pub fn porter_duff_coefficients(self) -> Option<[f32; 4]> {
        let coeffs = match self {
            Self::Clear => [0.0, 0.0, 0.0, 0.0],
            Self::Src => [1.0, 0.0, 0.0, 0.0],
            Self::Dst => [0.0, 1.0, 0.0, 0.0],
            Self::SrcOver => [1.0, 1.0, 0.0, -1.0],
            Self::DstOver => [1.0, 1.0, -1.0, 0.0],
            Self::SrcIn => [0.0, 0.0, 1.0, 0.0],
            Self::DstIn => [0.0, 0.0, 0.0, 1.0],
            Self::SrcOut => [1.0, 0.0, -1.0, 0.0],
            Self::DstOut => [0.0, 1.0, 0.0, -1.0],
            Self::SrcAtop => [0.0, 1.0, 1.0, -1.0],
            Self::DstAtop => [1.0, 0.0, -1.0, 1.0],
            Self::Xor => [1.0, 1.0, -1.0, -1.0],
            Self::Plus => [1.0, 1.0, 0.0, 0.0],
            _ => return None,
        };
        Some(coeffs)
    }
}

impl std::fmt::Display for BlendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl BlendModeSet for BlendMode {
    const COUNT: usize = BlendMode::ALL.len();

    fn ordinal(self) -> usize {
        self as usize
    }

    fn from_ordinal(ordinal: usize) -> Option<Self> {
        BlendMode::ALL.get(ordinal).copied()
    }

    fn name(self) -> &'static str {
        BlendMode::name(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_and_ordinals() {
        assert_eq!(BlendMode::COUNT, 42);
        for (i, mode) in BlendMode::ALL.iter().enumerate() {
            assert_eq!(mode.ordinal(), i);
            assert_eq!(BlendMode::from_ordinal(i), Some(*mode));
        }
        assert_eq!(BlendMode::from_ordinal(BlendMode::COUNT), None);
    }

    #[test]
    fn test_order_is_stable() {
        assert_eq!(BlendMode::Clear.ordinal(), 0);
        assert_eq!(BlendMode::SrcOver.ordinal(), 3);
        assert_eq!(BlendMode::Plus.ordinal(), 12);
        assert_eq!(BlendMode::Luminosity.ordinal(), 41);
        assert_eq!(BlendMode::Luminosity.name(), "LUMINOSITY");
    }

    #[test]
    fn test_porter_duff_prefix() {
        assert!(BlendMode::ALL[..=BlendMode::Plus.ordinal()].iter().all(|m| m.is_porter_duff()));
        assert!(!BlendMode::Multiply.is_porter_duff());
    }
}
