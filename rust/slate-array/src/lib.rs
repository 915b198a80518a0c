//! Type-erased growable contiguous buffers.
//!
//! [`RawArray`] stores fixed-size elements whose width is chosen at runtime, moves
//! them with raw byte copies, and grows through a single capacity manager that can
//! be frozen ("settled"). [`TypedArray`] layers a typed API over it for
//! plain-old-data element types.

pub mod align;
pub mod alloc;
mod array;
pub mod config;
mod mutate;
mod slice;
pub mod trace;
mod typed;


pub use alloc::{ArrayAllocator, BudgetAllocator, SystemAllocator};
pub use array::{Destructor, RawArray};
pub use config::ArrayConfig;
pub use trace::{AllocEvent, AllocStats, AllocTrace, TraceReport};
pub use typed::TypedArray;
