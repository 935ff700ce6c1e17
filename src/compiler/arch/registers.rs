use serde::{Deserialize, Serialize};

/**
 * RegSize stores the bit size of a register.  This is used by the MIR to
 * tag every expression with the width of the value it produces and by the
 * code generator to pick the sub-register that holds that value.  It is meant
 * to be independent of specific CPU architectures (e.g. x86 or ARM).
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RegSize {
    R8,
    R16,
    R32,
    R64,
}

impl RegSize {
    /// Returns the register size which exactly holds a value of `nbytes`.
    /// Only 1, 2, 4 and 8 byte values fit in a register.
    pub fn assign(nbytes: u64) -> Option<RegSize> {
        match nbytes {
            1 => Some(RegSize::R8),
            2 => Some(RegSize::R16),
            4 => Some(RegSize::R32),
            8 => Some(RegSize::R64),
            _ => None,
        }
    }

    /// Like [`RegSize::assign`] but treats a size with no register as a
    /// compiler bug.
    pub fn for_size(nbytes: u64) -> RegSize {
        Self::assign(nbytes)
            .unwrap_or_else(|| panic!("unsupported register size: {} bytes", nbytes))
    }

    pub fn bytes(&self) -> u64 {
        match self {
            RegSize::R8 => 1,
            RegSize::R16 => 2,
            RegSize::R32 => 4,
            RegSize::R64 => 8,
        }
    }

    /// The GNU assembler mnemonic suffix for an operation of this width.
    pub fn suffix(&self) -> char {
        match self {
            RegSize::R8 => 'b',
            RegSize::R16 => 'w',
            RegSize::R32 => 'l',
            RegSize::R64 => 'q',
        }
    }
}

impl std::fmt::Display for RegSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegSize::R8 => f.write_str("i8"),
            RegSize::R16 => f.write_str("i16"),
            RegSize::R32 => f.write_str("i32"),
            RegSize::R64 => f.write_str("i64"),
        }
    }
}
