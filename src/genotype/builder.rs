//! Schema construction: field binding, gene specs and compilation.
//!
//! Users describe their phenotype inside a builder closure by binding
//! references to its fields; compilation sorts the declared genes widest
//! first, packs them with the best-fit allocator and emits the runtime
//! [`Schema`].

use std::fmt;
use std::marker::PhantomData;
use std::mem;

use crate::crossover::{single_point, Crossover, Probability};
use crate::genotype::chromosome::{Chromosome, ChromosomeKind, Flags};
use crate::genotype::gene::{DynResolver, Gene, Slot};
use crate::genotype::packer::BestFitPacker;
use crate::genotype::scalar::{Bindable, Scalar};
use crate::genotype::schema::{Phenotype, Schema};
use crate::genotype::ScalarKind;
use crate::mutation::{BitString, Mutation};

/// Errors detected while building a schema. All are fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A bound reference does not point inside the phenotype template.
    BindOutOfRange {
        /// Signed distance from the template root.
        offset: isize,
        /// Size of the phenotype in bytes.
        size: usize,
    },
    /// A declared bit width is zero or wider than the scalar type.
    BitWidth {
        /// Requested width.
        bits: u32,
        /// Natural width of the bound scalar.
        max: u32,
    },
    /// An inline gene run extends past the end of the phenotype.
    FieldOverrun {
        /// Byte offset of the first element.
        offset: usize,
        /// Declared element count.
        len: usize,
        /// Size of the phenotype in bytes.
        size: usize,
    },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::BindOutOfRange { offset, size } => {
                write!(f, "bound reference at offset {offset} outside phenotype of {size} bytes")
            }
            SchemaError::BitWidth { bits, max } => {
                write!(f, "bit width {bits} invalid for scalar of {max} bits")
            }
            SchemaError::FieldOverrun { offset, len, size } => {
                write!(f, "{len} elements at offset {offset} overrun phenotype of {size} bytes")
            }
        }
    }
}

impl std::error::Error for SchemaError {}

/// Resolves field references against the phenotype template.
///
/// Handed to the builder closure alongside the template; every gene starts
/// as a [`Binder::gene`] call on one of the template's fields.
pub struct Binder<P> {
    base: usize,
    _phenotype: PhantomData<fn(&P)>,
}

impl<P> Binder<P> {
    fn new(template: &P) -> Self {
        Self {
            base: template as *const P as usize,
            _phenotype: PhantomData,
        }
    }

    /// Bind a field of the template to a new gene spec.
    ///
    /// The field's scalar kind, natural bit width and element count are
    /// derived from its type; its byte offset is recovered from the
    /// reference. References outside the template poison the spec and fail
    /// the build.
    #[must_use]
    pub fn gene<T: Bindable>(&self, field: &T) -> GeneSpec {
        let addr = field as *const T as usize;
        let size = mem::size_of::<P>();
        let offset = addr.wrapping_sub(self.base);

        let mut spec = GeneSpec {
            kind: <T::Elem as Scalar>::KIND,
            bits: <T::Elem as Scalar>::KIND.bits(),
            cells: <T::Elem as Scalar>::CELLS,
            len: T::LEN,
            index: 0,
            offset,
            dynamic: T::resolver(),
            error: None,
        };
        if addr < self.base || offset + mem::size_of::<T>() > size {
            spec.error = Some(SchemaError::BindOutOfRange {
                offset: addr as isize - self.base as isize,
                size,
            });
        }
        spec
    }
}

/// One bound field, before compilation.
///
/// Chain [`bits`](Self::bits), [`len`](Self::len) and
/// [`index`](Self::index) to refine the declaration.
#[derive(Debug)]
pub struct GeneSpec {
    pub(crate) kind: ScalarKind,
    pub(crate) bits: u32,
    pub(crate) cells: usize,
    pub(crate) len: usize,
    pub(crate) index: usize,
    pub(crate) offset: usize,
    pub(crate) dynamic: Option<DynResolver>,
    pub(crate) error: Option<SchemaError>,
}

impl GeneSpec {
    /// Narrow the gene to `bits` bits per cell.
    ///
    /// Must be between 1 and the scalar's natural width.
    #[must_use]
    pub fn bits(mut self, bits: u32) -> Self {
        let max = self.kind.bits();
        if bits == 0 || bits > max {
            self.error.get_or_insert(SchemaError::BitWidth { bits, max });
        } else {
            self.bits = bits;
        }
        self
    }

    /// Cover `len` consecutive elements starting at the bound field.
    #[must_use]
    pub fn len(mut self, len: usize) -> Self {
        self.len = len;
        self
    }

    /// Start at element `index` of a dynamic container.
    #[must_use]
    pub fn index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }
}

/// Ordered list of chromosome declarations produced by the builder closure.
#[derive(Default)]
pub struct Spec {
    chromosomes: Vec<ChromosomeSpec>,
}

impl Spec {
    /// Empty spec.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an integer chromosome.
    ///
    /// Defaults to single-point crossover applied with probability 0.75 and
    /// bit-string mutation with 0.5 expected flips.
    pub fn int_chromosome(&mut self, genes: impl IntoIterator<Item = GeneSpec>) -> &mut ChromosomeSpec {
        let mut spec = ChromosomeSpec::new(ChromosomeKind::Int, genes);
        spec.crossover_op = Some(Box::new(Probability::new(0.75, single_point())));
        spec.mutation_op = Some(Box::new(BitString::new(0.5)));
        self.push(spec)
    }

    /// Declare a single-precision float chromosome.
    ///
    /// Float chromosomes carry no default operators; until configured,
    /// crossover copies the parents through and mutation does nothing.
    pub fn float32_chromosome(&mut self, genes: impl IntoIterator<Item = GeneSpec>) -> &mut ChromosomeSpec {
        self.push(ChromosomeSpec::new(ChromosomeKind::Float32, genes))
    }

    /// Declare a double-precision float chromosome. See
    /// [`float32_chromosome`](Self::float32_chromosome) for operator defaults.
    pub fn float64_chromosome(&mut self, genes: impl IntoIterator<Item = GeneSpec>) -> &mut ChromosomeSpec {
        self.push(ChromosomeSpec::new(ChromosomeKind::Float64, genes))
    }

    fn push(&mut self, spec: ChromosomeSpec) -> &mut ChromosomeSpec {
        self.chromosomes.push(spec);
        let last = self.chromosomes.len() - 1;
        &mut self.chromosomes[last]
    }
}

/// One chromosome declaration: genes plus operator configuration.
pub struct ChromosomeSpec {
    kind: ChromosomeKind,
    flags: Flags,
    genes: Vec<GeneSpec>,
    crossover_op: Option<Box<dyn Crossover>>,
    mutation_op: Option<Box<dyn Mutation>>,
}

impl ChromosomeSpec {
    fn new(kind: ChromosomeKind, genes: impl IntoIterator<Item = GeneSpec>) -> Self {
        Self {
            kind,
            flags: Flags::NONE,
            genes: genes.into_iter().collect(),
            crossover_op: None,
            mutation_op: None,
        }
    }

    /// Replace the crossover operator.
    pub fn crossover(&mut self, op: impl Crossover + 'static) -> &mut Self {
        self.crossover_op = Some(Box::new(op));
        self
    }

    /// Replace the mutation operator.
    pub fn mutation(&mut self, op: impl Mutation + 'static) -> &mut Self {
        self.mutation_op = Some(Box::new(op));
        self
    }

    /// Set trait markers consulted by operator compatibility checks.
    pub fn flags(&mut self, flags: Flags) -> &mut Self {
        self.flags = flags;
        self
    }
}

/// Run the builder closure against a fresh template and compile the result.
pub(crate) fn compile<P, F>(spec_fn: F) -> Result<Schema<P>, SchemaError>
where
    P: Phenotype,
    F: FnOnce(&Binder<P>, &P) -> Spec,
{
    let template = P::default();
    let binder = Binder::new(&template);
    let spec = spec_fn(&binder, &template);

    let mut chromosomes = Vec::with_capacity(spec.chromosomes.len());
    let mut size_in_bytes = 0;

    for mut chromosome_spec in spec.chromosomes {
        if let Some(op) = &chromosome_spec.crossover_op {
            if !op.is_compatible(chromosome_spec.kind, chromosome_spec.flags) {
                log::warn!(
                    "crossover operator incompatible with {:?} chromosome (flags {:?})",
                    chromosome_spec.kind,
                    chromosome_spec.flags
                );
            }
        }
        if let Some(op) = &chromosome_spec.mutation_op {
            if !op.is_compatible(chromosome_spec.kind, chromosome_spec.flags) {
                log::warn!(
                    "mutation operator incompatible with {:?} chromosome (flags {:?})",
                    chromosome_spec.kind,
                    chromosome_spec.flags
                );
            }
        }

        // Widest genes first; the sort is stable so equal widths keep
        // their declaration order.
        chromosome_spec.genes.sort_by(|a, b| b.bits.cmp(&a.bits));

        let mut packer = BestFitPacker::new();
        let mut genes = Vec::new();

        for gene_spec in &chromosome_spec.genes {
            if let Some(err) = &gene_spec.error {
                return Err(err.clone());
            }
            let cell_bytes = gene_spec.kind.bytes();

            if let Some(resolver) = gene_spec.dynamic {
                for i in 0..gene_spec.len {
                    let element = (gene_spec.index + i) * gene_spec.cells * cell_bytes;
                    for cell in 0..gene_spec.cells {
                        genes.push(Gene {
                            kind: gene_spec.kind,
                            locus: packer.place(gene_spec.bits),
                            slot: Slot::Indexed {
                                offset: gene_spec.offset,
                                byte_index: element + cell * cell_bytes,
                                resolver,
                            },
                        });
                    }
                }
            } else {
                let cells = gene_spec.len * gene_spec.cells;
                if gene_spec.offset + cells * cell_bytes > mem::size_of::<P>() {
                    return Err(SchemaError::FieldOverrun {
                        offset: gene_spec.offset,
                        len: gene_spec.len,
                        size: mem::size_of::<P>(),
                    });
                }
                for cell in 0..cells {
                    genes.push(Gene {
                        kind: gene_spec.kind,
                        locus: packer.place(gene_spec.bits),
                        slot: Slot::Inline {
                            offset: gene_spec.offset + cell * cell_bytes,
                        },
                    });
                }
            }
        }

        let bytes_length = packer.bytes_used();
        chromosomes.push(Chromosome {
            kind: chromosome_spec.kind,
            flags: chromosome_spec.flags,
            genes,
            bytes_index: size_in_bytes,
            bytes_length,
            crossover: chromosome_spec.crossover_op,
            mutation: chromosome_spec.mutation_op,
        });
        size_in_bytes += bytes_length;
    }

    Ok(Schema::assemble(chromosomes, size_in_bytes))
}
