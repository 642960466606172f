use crate::types::ElementType;
use bytemuck::Pod;

/// Maps a Rust element type to its wire `ElementType` tag, the
/// compile-time equivalent of the source's `reflect.Type` lookup tables.
pub trait Element: Pod {
    const DTYPE: ElementType;
}

impl Element for i8 {
    const DTYPE: ElementType = ElementType::Int8;
}
impl Element for i16 {
    const DTYPE: ElementType = ElementType::Int16;
}
impl Element for i32 {
    const DTYPE: ElementType = ElementType::Int32;
}
impl Element for i64 {
    const DTYPE: ElementType = ElementType::Int64;
}
impl Element for f32 {
    const DTYPE: ElementType = ElementType::Float32;
}
impl Element for f64 {
    const DTYPE: ElementType = ElementType::Float64;
}

// `bool` is deliberately not `Element`: not every byte pattern is a valid
// `bool`, so it can't implement `bytemuck::Pod`. Bool tensors are read/
// written as raw `u8` content instead (0/1), same as `float16` is left
// undecoded — see the module-level note in `tensor/mod.rs`.
