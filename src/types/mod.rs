use serde::{Deserialize, Serialize};

/// Element type tag for a tensor's byte buffer.
///
/// Mirrors the wire `ElementType` enum (§6): numeric codes and byte widths
/// are fixed by the protocol, not an implementation choice.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    #[default]
    Invalid = 0,
    Int8 = 1,
    Int16 = 2,
    Int32 = 3,
    Int64 = 4,
    Float16 = 5,
    Float32 = 6,
    Float64 = 7,
    Bool = 8,
}

impl ElementType {
    /// Size in bytes of a single element, per §6's fixed table.
    pub const fn element_size(&self) -> usize {
        match self {
            ElementType::Invalid => 1,
            ElementType::Int8 => 1,
            ElementType::Int16 => 2,
            ElementType::Int32 => 4,
            ElementType::Int64 => 8,
            ElementType::Float16 => 2,
            ElementType::Float32 => 4,
            ElementType::Float64 => 8,
            ElementType::Bool => 1,
        }
    }

    pub const fn from_wire(code: i32) -> Option<Self> {
        match code {
            0 => Some(ElementType::Invalid),
            1 => Some(ElementType::Int8),
            2 => Some(ElementType::Int16),
            3 => Some(ElementType::Int32),
            4 => Some(ElementType::Int64),
            5 => Some(ElementType::Float16),
            6 => Some(ElementType::Float32),
            7 => Some(ElementType::Float64),
            8 => Some(ElementType::Bool),
            _ => None,
        }
    }

    pub const fn to_wire(self) -> i32 {
        self as i32
    }
}

/// Product of a dimension vector; empty dims is a scalar of size 1.
pub fn dim_product(dims: &[i64]) -> i64 {
    dims.iter().product()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_sizes_match_wire_table() {
        assert_eq!(ElementType::Invalid.element_size(), 1);
        assert_eq!(ElementType::Int8.element_size(), 1);
        assert_eq!(ElementType::Int16.element_size(), 2);
        assert_eq!(ElementType::Int32.element_size(), 4);
        assert_eq!(ElementType::Int64.element_size(), 8);
        assert_eq!(ElementType::Float16.element_size(), 2);
        assert_eq!(ElementType::Float32.element_size(), 4);
        assert_eq!(ElementType::Float64.element_size(), 8);
        assert_eq!(ElementType::Bool.element_size(), 1);
    }

    #[test]
    fn dim_product_handles_scalars() {
        assert_eq!(dim_product(&[]), 1);
        assert_eq!(dim_product(&[2, 5]), 10);
    }
}
