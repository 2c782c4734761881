//! Mapping algebra: derive row-level lineage from the lowered IR.
//!
//! Two phases. Candidate generation walks the DAG and yields one or two
//! mappings per node (how a `Where` output relates to its mask and source,
//! how a `Pick` output relates to its index and source, and so on).
//! Composition then eliminates every array that is not a root - roots being
//! the arrays trace tables and export tables actually reference - replacing
//! each (in, out) mapping pair through an eliminated node with their
//! composite, until only root-to-root mappings remain.
//!
//! Composite index arrays are ordinary IR: composing two many-to-many
//! mappings builds the row-matching join as expressions, so the evaluator
//! computes lineage through the same command stream as user data.

use std::collections::{BTreeSet, HashMap, HashSet};

use dtl_ir::{Arena, ArrayId, ArrayOp, ExprId, Mapping, traverse_depth_first};

/// Generate and compose the mappings for everything reachable from `roots`.
/// New index-array expressions are appended to the arena.
pub fn generate_mappings(arena: &mut Arena, roots: &[ArrayId]) -> Vec<Mapping> {
    let candidates = candidate_mappings(arena, roots);
    merge_mappings(arena, candidates, roots)
}

fn candidate_mappings(arena: &mut Arena, roots: &[ArrayId]) -> Vec<Mapping> {
    let root_ids: Vec<ExprId> = roots.iter().map(|&id| id.into()).collect();
    let nodes = traverse_depth_first(arena, &root_ids);

    let mut mappings = Vec::new();
    for node in nodes {
        let ExprId::Array(id) = node else {
            continue;
        };
        let expr = arena.array(id).clone();
        match &expr.op {
            // Leaves relate to nothing upstream.
            ArrayOp::BoolLiteral(_)
            | ArrayOp::IntegerLiteral(_)
            | ArrayOp::FloatLiteral(_)
            | ArrayOp::TextLiteral(_)
            | ArrayOp::BytesLiteral(_)
            | ArrayOp::Import { .. }
            | ArrayOp::Range
            | ArrayOp::JoinLeft
            | ArrayOp::JoinRight => {}

            ArrayOp::Where { source, mask } => {
                // Surviving input rows, as indexes into the unfiltered
                // array. `expr.shape` is the where-shape of this mask, so
                // the filter constructor accepts it directly.
                let mask_shape = arena.array(*mask).shape;
                let full_index = arena.range(mask_shape);
                let src_index = arena.filter(full_index, *mask, expr.shape);
                let tgt_index = arena.range(expr.shape);
                mappings.push(Mapping::ManyToMany {
                    src: *mask,
                    tgt: id,
                    src_index,
                    tgt_index,
                });
                mappings.push(Mapping::ManyToMany {
                    src: *source,
                    tgt: id,
                    src_index,
                    tgt_index,
                });
            }

            ArrayOp::Pick { source, indexes } => {
                mappings.push(Mapping::Identity {
                    src: *indexes,
                    tgt: id,
                });
                // Output row i gathers source row indexes[i]: the pairs are
                // (indexes[i], i).
                let tgt_index = arena.range(expr.shape);
                mappings.push(Mapping::ManyToMany {
                    src: *source,
                    tgt: id,
                    src_index: *indexes,
                    tgt_index,
                });
            }

            ArrayOp::Add { a, b }
            | ArrayOp::Subtract { a, b }
            | ArrayOp::Multiply { a, b }
            | ArrayOp::Divide { a, b }
            | ArrayOp::EqualTo { a, b } => {
                mappings.push(Mapping::Identity { src: *a, tgt: id });
                mappings.push(Mapping::Identity { src: *b, tgt: id });
            }
        }
    }
    mappings
}

/// Eliminate every non-root endpoint by pairwise composition.
fn merge_mappings(arena: &mut Arena, mappings: Vec<Mapping>, roots: &[ArrayId]) -> Vec<Mapping> {
    let roots: HashSet<ArrayId> = roots.iter().copied().collect();

    // Consumed mappings become `None`; composites are appended.
    let mut store: Vec<Option<Mapping>> = mappings.into_iter().map(Some).collect();
    let mut by_src: HashMap<ArrayId, BTreeSet<usize>> = HashMap::new();
    let mut by_tgt: HashMap<ArrayId, BTreeSet<usize>> = HashMap::new();
    for (index, mapping) in store.iter().enumerate() {
        let mapping = mapping.as_ref().expect("freshly filled store");
        by_src.entry(mapping.src()).or_default().insert(index);
        by_tgt.entry(mapping.tgt()).or_default().insert(index);
    }

    // Ascending id order keeps elimination (and the generated index
    // expressions) deterministic.
    let nonroots: BTreeSet<ArrayId> = by_src
        .keys()
        .chain(by_tgt.keys())
        .copied()
        .filter(|id| !roots.contains(id))
        .collect();

    for node in nonroots {
        let incoming: Vec<usize> = by_tgt.remove(&node).into_iter().flatten().collect();
        let outgoing: Vec<usize> = by_src.remove(&node).into_iter().flatten().collect();

        for &i in &incoming {
            for &j in &outgoing {
                let fst = store[i].clone().expect("incoming mapping already consumed");
                let snd = store[j].clone().expect("outgoing mapping already consumed");
                let merged = merge_pair(arena, fst, snd);
                let index = store.len();
                by_src.entry(merged.src()).or_default().insert(index);
                by_tgt.entry(merged.tgt()).or_default().insert(index);
                store.push(Some(merged));
            }
        }

        for &i in &incoming {
            let mapping = store[i].take().expect("incoming mapping already consumed");
            if let Some(set) = by_src.get_mut(&mapping.src()) {
                set.remove(&i);
            }
        }
        for &j in &outgoing {
            let mapping = store[j].take().expect("outgoing mapping already consumed");
            if let Some(set) = by_tgt.get_mut(&mapping.tgt()) {
                set.remove(&j);
            }
        }
    }

    store.into_iter().flatten().collect()
}

/// Compose two mappings sharing a middle array into one from `fst.src` to
/// `snd.tgt`.
pub(crate) fn merge_pair(arena: &mut Arena, fst: Mapping, snd: Mapping) -> Mapping {
    assert_eq!(
        fst.tgt(),
        snd.src(),
        "composing mappings that do not share a node",
    );

    match (fst, snd) {
        // Identity composes by substitution on either side.
        (Mapping::Identity { src, .. }, snd) => with_src(snd, src),
        (fst, Mapping::Identity { tgt, .. }) => with_tgt(fst, tgt),

        // Everything else goes through the many-to-many row-matching join.
        (fst, snd) => {
            let (src, _, fst_src_index, fst_tgt_index) = upcast(arena, fst);
            let (_, tgt, snd_src_index, snd_tgt_index) = upcast(arena, snd);

            // Match rows of `fst` against rows of `snd` where
            // `fst.tgt_index = snd.src_index`, via the full product.
            let fst_shape = arena.array(fst_tgt_index).shape;
            let snd_shape = arena.array(snd_src_index).shape;
            let shape_full = arena.join_shape(fst_shape, snd_shape);
            let left_full = arena.join_left(shape_full);
            let right_full = arena.join_right(shape_full);

            let fst_values = arena.pick(fst_tgt_index, left_full);
            let snd_values = arena.pick(snd_src_index, right_full);
            let mask = arena.equal_to(fst_values, snd_values);

            let shape = arena.where_shape(mask);
            let fst_rows = arena.filter(left_full, mask, shape);
            let snd_rows = arena.filter(right_full, mask, shape);

            let src_index = arena.pick(fst_src_index, fst_rows);
            let tgt_index = arena.pick(snd_tgt_index, snd_rows);

            Mapping::ManyToMany {
                src,
                tgt,
                src_index,
                tgt_index,
            }
        }
    }
}

fn with_src(mapping: Mapping, src: ArrayId) -> Mapping {
    match mapping {
        Mapping::Identity { tgt, .. } => Mapping::Identity { src, tgt },
        Mapping::ManyToOne { tgt, tgt_index, .. } => Mapping::ManyToOne {
            src,
            tgt,
            tgt_index,
        },
        Mapping::OneToMany { tgt, src_index, .. } => Mapping::OneToMany {
            src,
            tgt,
            src_index,
        },
        Mapping::ManyToMany {
            tgt,
            src_index,
            tgt_index,
            ..
        } => Mapping::ManyToMany {
            src,
            tgt,
            src_index,
            tgt_index,
        },
    }
}

fn with_tgt(mapping: Mapping, tgt: ArrayId) -> Mapping {
    match mapping {
        Mapping::Identity { src, .. } => Mapping::Identity { src, tgt },
        Mapping::ManyToOne { src, tgt_index, .. } => Mapping::ManyToOne {
            src,
            tgt,
            tgt_index,
        },
        Mapping::OneToMany { src, src_index, .. } => Mapping::OneToMany {
            src,
            tgt,
            src_index,
        },
        Mapping::ManyToMany {
            src,
            src_index,
            tgt_index,
            ..
        } => Mapping::ManyToMany {
            src,
            tgt,
            src_index,
            tgt_index,
        },
    }
}

/// View a mapping as (src, tgt, src_index, tgt_index), materialising the
/// missing index of the one-sided forms as a `Range`.
fn upcast(arena: &mut Arena, mapping: Mapping) -> (ArrayId, ArrayId, ArrayId, ArrayId) {
    match mapping {
        Mapping::Identity { .. } => {
            unreachable!("identity mappings compose by substitution")
        }
        Mapping::ManyToOne {
            src,
            tgt,
            tgt_index,
        } => {
            let src_index = arena.range(arena.array(tgt_index).shape);
            (src, tgt, src_index, tgt_index)
        }
        Mapping::OneToMany {
            src,
            tgt,
            src_index,
        } => {
            let tgt_index = arena.range(arena.array(src_index).shape);
            (src, tgt, src_index, tgt_index)
        }
        Mapping::ManyToMany {
            src,
            tgt,
            src_index,
            tgt_index,
        } => (src, tgt, src_index, tgt_index),
    }
}
