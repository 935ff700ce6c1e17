//! Memory layout computation shared by composite types and stack frames.

use serde::Serialize;

/// Rounds `n` up to the next multiple of `alignment`.
pub fn align(n: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        panic!("Alignment must be non-zero");
    }
    (n + alignment - 1) / alignment * alignment
}

/// The size, alignment and member offsets of a type.  Scalars have no
/// offsets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Layout {
    pub size: u64,
    pub alignment: u64,
    pub offsets: Vec<u64>,
}

impl Layout {
    pub fn scalar(size: u64, alignment: u64) -> Layout {
        Layout {
            size,
            alignment,
            offsets: vec![],
        }
    }
}

/// Places values one after another, aligning each value to its own
/// alignment.  Used for struct members (offsets grow upward from 0) and for
/// stack frames (offsets grow downward from the frame base).
#[derive(Debug, Default)]
pub struct SequentialAllocator {
    cursor: u64,
    max_align: u64,
}

impl SequentialAllocator {
    pub fn new() -> SequentialAllocator {
        SequentialAllocator {
            cursor: 0,
            max_align: 1,
        }
    }

    /// Reserves `size` bytes above the cursor and returns the offset of the
    /// first byte.
    pub fn allocate(&mut self, size: u64, alignment: u64) -> u64 {
        let offset = align(self.cursor, alignment);
        self.cursor = offset + size;
        self.max_align = self.max_align.max(alignment);
        offset
    }

    /// Reserves `size` bytes below the base and returns the (positive)
    /// distance from the base to the first byte of the value.
    pub fn allocate_down(&mut self, size: u64, alignment: u64) -> u64 {
        self.cursor = align(self.cursor + size, alignment);
        self.max_align = self.max_align.max(alignment);
        self.cursor
    }

    /// Total number of bytes reserved so far, without trailing padding.
    pub fn used(&self) -> u64 {
        self.cursor
    }

    pub fn max_alignment(&self) -> u64 {
        self.max_align
    }

    /// The reserved size padded to the largest alignment seen.
    pub fn size(&self) -> u64 {
        align(self.cursor, self.max_align)
    }
}

/// Lays out the members of a struct, given the `(size, alignment)` of each
/// member in declaration order.
pub fn struct_layout<I: IntoIterator<Item = (u64, u64)>>(members: I) -> Layout {
    let mut alloc = SequentialAllocator::new();
    let offsets = members
        .into_iter()
        .map(|(size, alignment)| alloc.allocate(size, alignment))
        .collect();

    Layout {
        size: alloc.size(),
        alignment: alloc.max_alignment(),
        offsets,
    }
}

/// Lays out the members of a union: every member lives at offset 0.
pub fn union_layout<I: IntoIterator<Item = (u64, u64)>>(members: I) -> Layout {
    let mut max_size = 0;
    let mut max_align = 1;
    let mut offsets = vec![];
    for (size, alignment) in members {
        max_size = max_size.max(size);
        max_align = max_align.max(alignment);
        offsets.push(0);
    }

    Layout {
        size: align(max_size, max_align),
        alignment: max_align,
        offsets,
    }
}
