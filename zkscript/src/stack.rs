//! Compile-time addresses for operands living on the evaluation stack.
//!
//! A descriptor names an operand by the depth of its deepest scalar
//! (`position`), the number of consecutive scalars encoding it, and a
//! `negate` flag recording whether the operand should enter the next
//! computation with its sign flipped. Descriptors are immutable; pushing `k`
//! new items above an operand is modelled by `shift(k)`.
//!
//! Depth 0 is the top of the stack. The reserved position `-1` addresses the
//! bottom of the stack (where the field characteristic lives) via
//! `OP_DEPTH OP_1SUB`.

use crate::ScriptError;

/// An operand occupying consecutive stack depths.
pub trait StackElement {
    /// Depth of the deepest scalar of the element.
    fn position(&self) -> i64;

    /// Number of scalars encoding the element.
    fn length(&self) -> usize;

    /// Depth of the shallowest scalar of the element.
    fn top_depth(&self) -> i64 {
        self.position() - self.length() as i64 + 1
    }

    /// Whether the scalar ranges of `self` and `other` share any depth.
    fn overlaps(&self, other: &dyn StackElement) -> bool {
        self.top_depth() <= other.position() && other.top_depth() <= self.position()
    }

    /// Whether every scalar of `self` is strictly deeper than every scalar
    /// of `other`.
    fn is_before(&self, other: &dyn StackElement) -> bool {
        self.top_depth() > other.position()
    }
}

/// Fail unless the elements are pairwise non-overlapping and listed from
/// deepest to shallowest.
///
/// Component entry points call this on their operand descriptors before
/// emitting any opcodes.
pub fn check_order(elements: &[&dyn StackElement]) -> Result<(), ScriptError> {
    for (i, pair) in elements.windows(2).enumerate() {
        if pair[0].overlaps(pair[1]) {
            return Err(ScriptError::MisorderedOperands(format!(
                "elements {i} (depths {}..{}) and {} (depths {}..{}) overlap",
                pair[0].top_depth(),
                pair[0].position(),
                i + 1,
                pair[1].top_depth(),
                pair[1].position(),
            )));
        }
        if !pair[0].is_before(pair[1]) {
            return Err(ScriptError::MisorderedOperands(format!(
                "element {i} (deepest depth {}) is not before element {} (deepest depth {})",
                pair[0].position(),
                i + 1,
                pair[1].position(),
            )));
        }
    }
    Ok(())
}

/// A single stack item treated as a plain number (e.g. the modulus, a branch
/// marker, or a scalar bit).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackNumber {
    pub position: i64,
    pub negate: bool,
}

impl StackNumber {
    pub fn new(position: i64, negate: bool) -> Self {
        StackNumber { position, negate }
    }

    /// The bottom-of-stack address used for the field characteristic.
    pub fn bottom() -> Self {
        StackNumber::new(-1, false)
    }

    pub fn shift(&self, k: i64) -> Self {
        StackNumber::new(self.position + k, self.negate)
    }
}

impl StackElement for StackNumber {
    fn position(&self) -> i64 {
        self.position
    }

    fn length(&self) -> usize {
        1
    }
}

/// A finite-field element of some extension degree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackFiniteFieldElement {
    pub position: i64,
    pub negate: bool,
    pub extension_degree: usize,
}

impl StackFiniteFieldElement {
    pub fn new(position: i64, negate: bool, extension_degree: usize) -> Self {
        StackFiniteFieldElement {
            position,
            negate,
            extension_degree,
        }
    }

    /// The element of degree `n` sitting on top of the stack.
    pub fn on_top(extension_degree: usize) -> Self {
        StackFiniteFieldElement::new(extension_degree as i64 - 1, false, extension_degree)
    }

    pub fn shift(&self, k: i64) -> Self {
        StackFiniteFieldElement::new(self.position + k, self.negate, self.extension_degree)
    }

    pub fn set_negate(&self, negate: bool) -> Self {
        StackFiniteFieldElement::new(self.position, negate, self.extension_degree)
    }

    /// The `i`-th coordinate (0 is the deepest) as a degree-1 element.
    pub fn extract_component(&self, i: usize) -> Self {
        debug_assert!(i < self.extension_degree);
        StackFiniteFieldElement::new(self.position - i as i64, self.negate, 1)
    }

    /// `position >= extension_degree - 1`, so the element fits on the stack.
    pub fn is_addressable(&self) -> bool {
        self.position >= self.extension_degree as i64 - 1
    }
}

impl StackElement for StackFiniteFieldElement {
    fn position(&self) -> i64 {
        self.position
    }

    fn length(&self) -> usize {
        self.extension_degree
    }
}

/// An affine elliptic-curve point: a pair of field-element descriptors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackEllipticCurvePoint {
    pub x: StackFiniteFieldElement,
    pub y: StackFiniteFieldElement,
}

impl StackEllipticCurvePoint {
    pub fn new(x: StackFiniteFieldElement, y: StackFiniteFieldElement) -> Self {
        StackEllipticCurvePoint { x, y }
    }

    /// The point of coordinate degree `n` sitting on top of the stack.
    pub fn on_top(extension_degree: usize) -> Self {
        let n = extension_degree as i64;
        StackEllipticCurvePoint::new(
            StackFiniteFieldElement::new(2 * n - 1, false, extension_degree),
            StackFiniteFieldElement::new(n - 1, false, extension_degree),
        )
    }

    pub fn shift(&self, k: i64) -> Self {
        StackEllipticCurvePoint::new(self.x.shift(k), self.y.shift(k))
    }

    /// Whether the point enters the next computation as `-P`.
    pub fn negate(&self) -> bool {
        self.y.negate
    }

    pub fn set_negate(&self, negate: bool) -> Self {
        StackEllipticCurvePoint::new(self.x, self.y.set_negate(negate))
    }

    /// Coordinates occupy adjacent depth ranges, `x` below `y`.
    pub fn is_contiguous(&self) -> bool {
        self.x.top_depth() == self.y.position + 1
    }
}

impl StackElement for StackEllipticCurvePoint {
    fn position(&self) -> i64 {
        self.x.position
    }

    fn length(&self) -> usize {
        self.x.extension_degree + self.y.extension_degree
    }
}

/// A projective elliptic-curve point: a triple of field-element descriptors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackEllipticCurvePointProjective {
    pub x: StackFiniteFieldElement,
    pub y: StackFiniteFieldElement,
    pub z: StackFiniteFieldElement,
}

impl StackEllipticCurvePointProjective {
    pub fn new(
        x: StackFiniteFieldElement,
        y: StackFiniteFieldElement,
        z: StackFiniteFieldElement,
    ) -> Self {
        StackEllipticCurvePointProjective { x, y, z }
    }

    /// The point of coordinate degree `n` sitting on top of the stack.
    pub fn on_top(extension_degree: usize) -> Self {
        let n = extension_degree as i64;
        StackEllipticCurvePointProjective::new(
            StackFiniteFieldElement::new(3 * n - 1, false, extension_degree),
            StackFiniteFieldElement::new(2 * n - 1, false, extension_degree),
            StackFiniteFieldElement::new(n - 1, false, extension_degree),
        )
    }

    pub fn shift(&self, k: i64) -> Self {
        StackEllipticCurvePointProjective::new(self.x.shift(k), self.y.shift(k), self.z.shift(k))
    }

    pub fn negate(&self) -> bool {
        self.y.negate
    }

    pub fn set_negate(&self, negate: bool) -> Self {
        StackEllipticCurvePointProjective::new(self.x, self.y.set_negate(negate), self.z)
    }

    pub fn is_contiguous(&self) -> bool {
        self.x.top_depth() == self.y.position + 1 && self.y.top_depth() == self.z.position + 1
    }
}

impl StackElement for StackEllipticCurvePointProjective {
    fn position(&self) -> i64 {
        self.x.position
    }

    fn length(&self) -> usize {
        self.x.extension_degree + self.y.extension_degree + self.z.extension_degree
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_moves_every_coordinate() {
        let p = StackEllipticCurvePointProjective::on_top(2);
        let q = p.shift(4);
        assert_eq!(q.x.position, p.x.position + 4);
        assert_eq!(q.y.position, p.y.position + 4);
        assert_eq!(q.z.position, p.z.position + 4);
    }

    #[test]
    fn overlap_detection() {
        let a = StackFiniteFieldElement::new(3, false, 2); // depths 2..3
        let b = StackFiniteFieldElement::new(1, false, 2); // depths 0..1
        let c = StackFiniteFieldElement::new(2, false, 2); // depths 1..2
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
        assert!(a.is_before(&b));
        assert!(!a.is_before(&c));
    }

    #[test]
    fn check_order_accepts_descending() {
        let x = StackFiniteFieldElement::new(3, false, 2);
        let y = StackFiniteFieldElement::new(1, false, 2);
        assert!(check_order(&[&x, &y]).is_ok());
    }

    #[test]
    fn check_order_rejects_overlap_and_misorder() {
        let x = StackFiniteFieldElement::new(3, false, 2);
        let y = StackFiniteFieldElement::new(2, false, 2);
        assert!(matches!(
            check_order(&[&x, &y]),
            Err(ScriptError::MisorderedOperands(_))
        ));
        let x = StackFiniteFieldElement::new(1, false, 2);
        let y = StackFiniteFieldElement::new(3, false, 2);
        assert!(check_order(&[&x, &y]).is_err());
    }

    #[test]
    fn components_and_tops() {
        let x = StackFiniteFieldElement::new(5, false, 3); // depths 3, 4, 5
        assert_eq!(x.top_depth(), 3);
        assert_eq!(x.extract_component(0).position, 5);
        assert_eq!(x.extract_component(2).position, 3);
        assert!(x.is_addressable());
        assert!(!StackFiniteFieldElement::new(1, false, 3).is_addressable());
    }

    #[test]
    fn on_top_layouts() {
        let e = StackFiniteFieldElement::on_top(4);
        assert_eq!((e.position, e.top_depth()), (3, 0));
        let p = StackEllipticCurvePoint::on_top(2);
        assert_eq!((p.x.position, p.y.position), (3, 1));
        assert!(p.is_contiguous());
    }
}
