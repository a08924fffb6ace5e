#![forbid(unsafe_code)]

//! Per-element styling hints derived from drag session state.
//!
//! The rendering layer asks for hints instead of the engine touching view
//! elements. A hint query reads the session's stored validity only while the
//! tree snapshot is still at the revision it was computed against; after a
//! revision change the hovered target is re-evaluated for that query.

/// How one node or column should render during a drag.
///
/// `is_valid_target` and `is_invalid_target` are never both `true`. Both are
/// `false` for elements that are not the current hover target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DerivedHints {
    /// The element is the node being dragged.
    pub is_dragging: bool,
    /// The element is hovered and would accept the drop.
    pub is_valid_target: bool,
    /// The element is hovered and would reject the drop.
    pub is_invalid_target: bool,
}

impl DerivedHints {
    /// Hints for an element unrelated to the drag.
    pub const NONE: Self = Self {
        is_dragging: false,
        is_valid_target: false,
        is_invalid_target: false,
    };

    /// Hints for a hovered element with the given validity.
    #[must_use]
    pub const fn hovered(valid: bool) -> Self {
        Self {
            is_dragging: false,
            is_valid_target: valid,
            is_invalid_target: !valid,
        }
    }

    /// Whether any highlight applies.
    #[must_use]
    pub const fn is_highlighted(self) -> bool {
        self.is_dragging || self.is_valid_target || self.is_invalid_target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_default() {
        assert_eq!(DerivedHints::NONE, DerivedHints::default());
        assert!(!DerivedHints::NONE.is_highlighted());
    }

    #[test]
    fn hovered_flags_are_exclusive() {
        let valid = DerivedHints::hovered(true);
        assert!(valid.is_valid_target && !valid.is_invalid_target);
        let invalid = DerivedHints::hovered(false);
        assert!(!invalid.is_valid_target && invalid.is_invalid_target);
        assert!(invalid.is_highlighted());
    }
}
