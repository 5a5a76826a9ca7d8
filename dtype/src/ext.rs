use super::*;

/// Maps a Rust scalar type to its element type.
pub trait HasPrimitiveType {
    const PRIMITIVE_TYPE: PrimitiveType;
}

macro_rules! impl_primitive_type_ext {
    ($($ty:ty => $ptype:expr),* $(,)?) => {
        $(impl HasPrimitiveType for $ty { const PRIMITIVE_TYPE: PrimitiveType = $ptype; })*
    };
}

impl_primitive_type_ext! {
    bool => PrimitiveType::Pred,
    i8 => PrimitiveType::S8, i16 => PrimitiveType::S16, i32 => PrimitiveType::S32, i64 => PrimitiveType::S64,
    u8 => PrimitiveType::U8, u16 => PrimitiveType::U16, u32 => PrimitiveType::U32, u64 => PrimitiveType::U64,
    f32 => PrimitiveType::F32, f64 => PrimitiveType::F64,
}
