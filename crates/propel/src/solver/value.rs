//! Module containing the value types used to represent integer values and
//! integer sets within the solver.

use std::num::NonZeroI64;

use rangelist::RangeList;

/// Type alias for a set of integers parameter value.
pub type IntSetVal = RangeList<IntVal>;

/// Type alias for an parameter integer value.
pub type IntVal = i64;

/// Type alias for a non-zero paremeter integer value.
pub type NonZeroIntVal = NonZeroI64;
