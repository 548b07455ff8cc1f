//! Gene codec: moving one scalar between a phenotype slot and its locus.

// The codec intentionally truncates the 64-bit register to the slot width.
#![allow(clippy::cast_possible_truncation)]

use crate::genotype::{Locus, ScalarKind};

/// Resolver for slots behind a variable-length container.
///
/// Given the container's address, a byte offset into its element storage
/// and the slot size, returns the element address, or `None` when the slot
/// is out of range for the container's current length.
#[doc(hidden)]
pub type DynResolver = unsafe fn(*mut u8, usize, usize) -> Option<*mut u8>;

/// Where a gene's scalar lives inside the phenotype.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Slot {
    /// Directly at a byte offset from the phenotype root.
    Inline {
        /// Byte offset from the root.
        offset: usize,
    },
    /// Inside a container found at `offset`, resolved per call.
    Indexed {
        /// Byte offset of the container from the root.
        offset: usize,
        /// Byte offset of the slot inside the container's element storage.
        byte_index: usize,
        /// Element address resolver.
        resolver: DynResolver,
    },
}

/// One (phenotype slot ↔ locus) pair.
#[derive(Debug, Clone, Copy)]
pub struct Gene {
    pub(crate) kind: ScalarKind,
    pub(crate) slot: Slot,
    pub(crate) locus: Locus,
}

impl Gene {
    /// Kind of the scalar this gene moves.
    #[must_use]
    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    /// Position of this gene inside its chromosome's byte region.
    #[must_use]
    pub fn locus(&self) -> Locus {
        self.locus
    }

    /// Serialize the gene's slot into the chromosome buffer.
    ///
    /// An out-of-range dynamic slot encodes as zero so genomes stay
    /// deterministic regardless of the phenotype's current length.
    pub(crate) fn encode<P>(&self, phenotype: &P, data: &mut [u8]) {
        let root = (phenotype as *const P).cast_mut().cast::<u8>();
        // SAFETY: inline offsets were bounds-checked against the phenotype
        // layout at build time; dynamic resolvers check the live container.
        let value = match unsafe { self.resolve(root) } {
            Some(slot) => unsafe { load_bits(slot, self.kind) },
            None => 0,
        };
        self.locus.write(data, value);
    }

    /// Deserialize the locus bits into the gene's slot.
    ///
    /// Out-of-range dynamic slots are skipped. Values narrower than the
    /// slot's natural width are zero-extended, never sign-extended.
    pub(crate) fn decode<P>(&self, phenotype: &mut P, data: &[u8]) {
        let root = (phenotype as *mut P).cast::<u8>();
        // SAFETY: as in `encode`; the phenotype is exclusively borrowed.
        if let Some(slot) = unsafe { self.resolve(root) } {
            let value = self.locus.read(data);
            unsafe { store_bits(slot, self.kind, value) };
        }
    }

    unsafe fn resolve(&self, root: *mut u8) -> Option<*mut u8> {
        match self.slot {
            Slot::Inline { offset } => Some(root.add(offset)),
            Slot::Indexed {
                offset,
                byte_index,
                resolver,
            } => resolver(root.add(offset), byte_index, self.kind.bytes()),
        }
    }
}

/// Load a slot's raw bits into a zero-extended 64-bit register.
unsafe fn load_bits(slot: *const u8, kind: ScalarKind) -> u64 {
    match kind {
        ScalarKind::Bool | ScalarKind::Int8 | ScalarKind::Uint8 => u64::from(slot.read()),
        ScalarKind::Int16 | ScalarKind::Uint16 => u64::from(slot.cast::<u16>().read_unaligned()),
        ScalarKind::Int32 | ScalarKind::Uint32 | ScalarKind::Float32 => {
            u64::from(slot.cast::<u32>().read_unaligned())
        }
        ScalarKind::Int64 | ScalarKind::Uint64 | ScalarKind::Float64 => slot.cast::<u64>().read_unaligned(),
    }
}

/// Store the low bytes of the register into the slot.
unsafe fn store_bits(slot: *mut u8, kind: ScalarKind, value: u64) {
    match kind {
        ScalarKind::Bool => slot.write(u8::from(value & 1 != 0)),
        ScalarKind::Int8 | ScalarKind::Uint8 => slot.write(value as u8),
        ScalarKind::Int16 | ScalarKind::Uint16 => slot.cast::<u16>().write_unaligned(value as u16),
        ScalarKind::Int32 | ScalarKind::Uint32 | ScalarKind::Float32 => {
            slot.cast::<u32>().write_unaligned(value as u32)
        }
        ScalarKind::Int64 | ScalarKind::Uint64 | ScalarKind::Float64 => {
            slot.cast::<u64>().write_unaligned(value)
        }
    }
}
