//! Element types carried by array shapes.
//!
//! The set mirrors the primitive types a collective-aware tensor IR needs:
//! predicates, signed/unsigned integers and the common float widths.

pub mod ext;


use std::fmt;

/// Primitive element type of an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::EnumCount, strum::EnumIter, strum::VariantArray, strum::FromRepr)]
#[cfg_attr(feature = "proptest", derive(proptest_derive::Arbitrary))]
pub enum PrimitiveType {
    Pred = 0,

    // Interleaved signed/unsigned, narrowest first
    S8 = 1,
    U8 = 2,
    S16 = 3,
    U16 = 4,
    S32 = 5,
    U32 = 6,
    S64 = 7,
    U64 = 8,

    F16 = 9,
    BF16 = 10,
    F32 = 11,
    F64 = 12,
}

impl PrimitiveType {
    pub const fn bytes(&self) -> usize {
        match self {
            Self::Pred => 1,
            Self::S8 | Self::U8 => 1,
            Self::S16 | Self::U16 => 2,
            Self::S32 | Self::U32 => 4,
            Self::S64 | Self::U64 => 8,
            Self::F16 | Self::BF16 => 2,
            Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    pub const fn is_pred(&self) -> bool {
        matches!(self, Self::Pred)
    }

    pub const fn is_signed(&self) -> bool {
        matches!(self, Self::S8 | Self::S16 | Self::S32 | Self::S64)
    }

    pub const fn is_unsigned(&self) -> bool {
        matches!(self, Self::U8 | Self::U16 | Self::U32 | Self::U64)
    }

    /// Signed or unsigned integer. Predicates are not integral.
    pub const fn is_integral(&self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::F16 | Self::BF16 | Self::F32 | Self::F64)
    }

    /// Inclusive value range representable by an integral type.
    ///
    /// Returns `None` for non-integral types. `U64` is clamped to `i64::MAX`
    /// since integer literals are stored as `i64`.
    pub const fn integral_range(&self) -> Option<(i64, i64)> {
        match self {
            Self::S8 => Some((i8::MIN as i64, i8::MAX as i64)),
            Self::S16 => Some((i16::MIN as i64, i16::MAX as i64)),
            Self::S32 => Some((i32::MIN as i64, i32::MAX as i64)),
            Self::S64 => Some((i64::MIN, i64::MAX)),
            Self::U8 => Some((0, u8::MAX as i64)),
            Self::U16 => Some((0, u16::MAX as i64)),
            Self::U32 => Some((0, u32::MAX as i64)),
            Self::U64 => Some((0, i64::MAX)),
            _ => None,
        }
    }

    /// Lowercase textual name (`f32`, `s32`, `pred`, ...).
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Pred => "pred",
            Self::S8 => "s8",
            Self::U8 => "u8",
            Self::S16 => "s16",
            Self::U16 => "u16",
            Self::S32 => "s32",
            Self::U32 => "u32",
            Self::S64 => "s64",
            Self::U64 => "u64",
            Self::F16 => "f16",
            Self::BF16 => "bf16",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
