//! # Calabash
//! Calabash is a pseudo-Boolean theory engine for CDCL-style search. It decides linear
//! integer-coefficient constraints over Boolean literals of the form
//! `c1*l1 + c2*l2 + ... + cn*ln >= k` (and the dual `<=`, at-most-k, and at-least-k forms) under
//! an external search that assigns Boolean variables, backtracks, and asks the engine to
//! propagate implications and report conflicts.
//!
//! The crate provides:
//! * canonicalization of raw pseudo-Boolean atoms to a normal form with positive coefficients
//!   ([`propagators::PbAtom`] internalized through [`propagators::PbTheory`]),
//! * a watched-literal propagation engine over the weighted watch predicate
//!   `watch_sum >= k + max_watch`,
//! * a generalized-resolution (cutting planes) conflict analyzer producing asserting
//!   pseudo-Boolean lemmas,
//! * a cost-model-driven sorting-network compiler ([`encoders::SortingNetwork`]) that lazily
//!   turns heavily propagating cardinality constraints into CNF,
//! * a minimal host context ([`engine::SatContext`]) carrying assignments, the trail, clauses,
//!   and justifications, against which the theory is driven and tested.
//!
//! A typical interaction internalizes an atom, assigns its governing literal, and feeds every
//! Boolean assignment back into the theory:
//! ```
//! use calabash::engine::SatContext;
//! use calabash::propagators::{PbAtom, PbTheory};
//!
//! let mut context = SatContext::default();
//! let mut theory = PbTheory::default();
//!
//! let x = context.new_literals().take(3).collect::<Vec<_>>();
//! let atom = PbAtom::AtLeast {
//!     literals: x.clone(),
//!     k: 1.into(),
//! };
//! let _atom_literal = theory
//!     .internalize_atom(&mut context, atom)
//!     .expect("the atom is feasible");
//! ```

pub mod basic_types;
pub mod encoders;
pub mod engine;
pub mod propagators;
pub mod statistics;

pub(crate) mod calabash_asserts;
