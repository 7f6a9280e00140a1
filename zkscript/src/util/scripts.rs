use num_bigint::BigInt;
use txscript::{Opcode, Script};

use crate::stack::{StackElement, StackNumber};

/// Whether an operand is consumed (rolled) or copied (picked) when moved to
/// the top of the stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveMode {
    Pick,
    Roll,
}

impl MoveMode {
    /// The mode encoded by a rolling-option bit.
    pub fn from_bool(is_rolled: bool) -> Self {
        if is_rolled {
            MoveMode::Roll
        } else {
            MoveMode::Pick
        }
    }
}

fn op(opcode: Opcode) -> Script {
    Script::from_opcode(opcode)
}

fn ops(opcodes: &[Opcode]) -> Script {
    Script::from_opcodes(opcodes)
}

/// Copy the `n` scalars at depths `position, position-1, ..` to the top of
/// the stack, preserving their order.
///
/// `position = -1` addresses the bottom of the stack through
/// `OP_DEPTH OP_1SUB`.
pub fn pick(position: i64, n: usize) -> Script {
    use Opcode::*;
    if position == -1 {
        let mut out = Script::new();
        for _ in 0..n {
            out += ops(&[OP_DEPTH, OP_1SUB, OP_PICK]);
        }
        return out;
    }
    debug_assert!(position + 1 >= n as i64, "picked range runs off the stack");
    match (position, n) {
        (0, 1) => op(OP_DUP),
        (1, 1) => op(OP_OVER),
        (1, 2) => op(OP_2DUP),
        (2, 3) => op(OP_3DUP),
        (3, 2) => op(OP_2OVER),
        _ => {
            // each copy pushes one item, so the target stays at `position`
            let mut out = Script::new();
            for _ in 0..n {
                out.push_int(&BigInt::from(position));
                out.push_opcode(OP_PICK);
            }
            out
        }
    }
}

/// Move (remove and re-push) the `n` scalars at depths `position, ..` to the
/// top of the stack, preserving their order.
pub fn roll(position: i64, n: usize) -> Script {
    use Opcode::*;
    if position == -1 {
        let mut out = Script::new();
        for _ in 0..n {
            out += ops(&[OP_DEPTH, OP_1SUB, OP_ROLL]);
        }
        return out;
    }
    debug_assert!(position + 1 >= n as i64, "rolled range runs off the stack");
    if position == n as i64 - 1 {
        // the block already sits on top
        return Script::new();
    }
    match (position, n) {
        (1, 1) => op(OP_SWAP),
        (2, 1) => op(OP_ROT),
        (2, 2) => ops(&[OP_ROT, OP_ROT]),
        (3, 2) => op(OP_2SWAP),
        (5, 2) => op(OP_2ROT),
        _ => {
            // removing an item re-exposes the next one at the same depth
            let mut out = Script::new();
            for _ in 0..n {
                out.push_int(&BigInt::from(position));
                out.push_opcode(OP_ROLL);
            }
            out
        }
    }
}

/// Bring a whole stack element to the top.
pub fn move_element(element: &dyn StackElement, mode: MoveMode) -> Script {
    move_slice(element, mode, 0, element.length())
}

/// Bring the scalars `start..end` (0 = deepest) of a stack element to the
/// top.
pub fn move_slice(element: &dyn StackElement, mode: MoveMode, start: usize, end: usize) -> Script {
    debug_assert!(start <= end && end <= element.length());
    let position = if element.position() == -1 {
        -1
    } else {
        element.position() - start as i64
    };
    match mode {
        MoveMode::Pick => pick(position, end - start),
        MoveMode::Roll => roll(position, end - start),
    }
}

/// Reduce the item below the modulus copy on top of the stack.
///
/// Expects `[.., x, q]` after `preparation` has run. Emits, according to the
/// flags:
///
/// * positive + constant reused: `OP_TUCK OP_MOD OP_OVER OP_ADD OP_OVER
///   OP_MOD` leaving `[.., q, x mod q]` with `x mod q` in `[0, q)`;
/// * positive + constant consumed: `.. OP_SWAP OP_MOD` leaving
///   `[.., x mod q]`;
/// * signed + constant reused: `OP_TUCK OP_MOD` leaving `[.., q, x % q]`;
/// * signed + constant consumed: `OP_MOD`.
pub fn mod_with_preparation(
    preparation: Script,
    is_positive: bool,
    is_constant_reused: bool,
) -> Script {
    use Opcode::*;
    let tail = match (is_positive, is_constant_reused) {
        (true, true) => ops(&[OP_TUCK, OP_MOD, OP_OVER, OP_ADD, OP_OVER, OP_MOD]),
        (true, false) => ops(&[OP_TUCK, OP_MOD, OP_OVER, OP_ADD, OP_SWAP, OP_MOD]),
        (false, true) => ops(&[OP_TUCK, OP_MOD]),
        (false, false) => op(OP_MOD),
    };
    preparation + tail
}

/// [`mod_with_preparation`] with no preparation: operand and modulus already
/// sit on top as `[.., x, q]`.
pub fn mod_top(is_positive: bool, is_constant_reused: bool) -> Script {
    mod_with_preparation(Script::new(), is_positive, is_constant_reused)
}

/// [`mod_with_preparation`] with the standard batched-modulo preparation
/// `OP_FROMALTSTACK OP_ROT`: the next coordinate is pulled from the altstack
/// and the modulus rotated on top of it.
pub fn mod_from_altstack(is_positive: bool, is_constant_reused: bool) -> Script {
    use Opcode::*;
    mod_with_preparation(
        ops(&[OP_FROMALTSTACK, OP_ROT]),
        is_positive,
        is_constant_reused,
    )
}

/// Fail the script unless the bottom-of-stack word equals `q`.
pub fn verify_bottom_constant(q: &BigInt) -> Script {
    use Opcode::*;
    let mut out = ops(&[OP_DEPTH, OP_1SUB, OP_PICK]);
    out.push_int(q);
    out.push_opcode(OP_EQUALVERIFY);
    out
}

/// Push a list of integer literals, first element deepest.
pub fn nums_to_script(nums: &[BigInt]) -> Script {
    let mut out = Script::new();
    for n in nums {
        out.push_int(n);
    }
    out
}

/// Compare a stack number against a constant, leaving a boolean (or
/// verifying in place when `is_verify` is set).
pub fn is_equal_to(element: &StackNumber, target: &BigInt, is_verify: bool, rolled: bool) -> Script {
    use Opcode::*;
    let mut out = move_element(element, MoveMode::from_bool(rolled));
    out.push_int(target);
    out.push_opcode(if is_verify { OP_EQUALVERIFY } else { OP_EQUAL });
    out
}

/// Reduce the top stack number modulo `q` (normalised into `[0, q)`) and
/// compare it against a constant.
///
/// The modulus is rolled (and thereby consumed) when `clean_constant` is
/// set, picked otherwise. When `rolled` is unset the compared number is
/// duplicated first and survives the comparison.
pub fn is_mod_equal_to(
    modulus: &StackNumber,
    target: &BigInt,
    clean_constant: bool,
    is_verify: bool,
    rolled: bool,
) -> Script {
    use Opcode::*;
    let mut out = Script::new();
    if !rolled {
        out.push_opcode(OP_DUP);
    }
    out += move_element(modulus, MoveMode::from_bool(clean_constant));
    out += mod_top(true, false);
    out.push_int(target);
    out.push_opcode(if is_verify { OP_EQUALVERIFY } else { OP_EQUAL });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::StackFiniteFieldElement;

    fn s(text: &str) -> Script {
        Script::parse_string(text).unwrap()
    }

    #[test]
    fn pick_compressed_forms() {
        assert_eq!(pick(0, 1), s("OP_DUP"));
        assert_eq!(pick(1, 1), s("OP_OVER"));
        assert_eq!(pick(1, 2), s("OP_2DUP"));
        assert_eq!(pick(2, 3), s("OP_3DUP"));
        assert_eq!(pick(3, 2), s("OP_2OVER"));
        assert_eq!(pick(7, 2), s("7 OP_PICK 7 OP_PICK"));
        assert_eq!(pick(-1, 1), s("OP_DEPTH OP_1SUB OP_PICK"));
    }

    #[test]
    fn roll_compressed_forms() {
        assert_eq!(roll(0, 1), Script::new());
        assert_eq!(roll(1, 2), Script::new());
        assert_eq!(roll(1, 1), s("OP_SWAP"));
        assert_eq!(roll(2, 1), s("OP_ROT"));
        assert_eq!(roll(2, 2), s("OP_ROT OP_ROT"));
        assert_eq!(roll(3, 2), s("OP_2SWAP"));
        assert_eq!(roll(5, 2), s("OP_2ROT"));
        assert_eq!(roll(4, 1), s("4 OP_ROLL"));
        assert_eq!(roll(-1, 1), s("OP_DEPTH OP_1SUB OP_ROLL"));
    }

    #[test]
    fn move_slice_addresses_components() {
        let x = StackFiniteFieldElement::new(5, false, 4); // depths 2..5
        assert_eq!(move_slice(&x, MoveMode::Pick, 2, 4), pick(3, 2));
        assert_eq!(move_element(&x, MoveMode::Roll), roll(5, 4));
    }

    #[test]
    fn mod_families() {
        assert_eq!(
            mod_top(true, true),
            s("OP_TUCK OP_MOD OP_OVER OP_ADD OP_OVER OP_MOD")
        );
        assert_eq!(
            mod_top(true, false),
            s("OP_TUCK OP_MOD OP_OVER OP_ADD OP_SWAP OP_MOD")
        );
        assert_eq!(mod_top(false, true), s("OP_TUCK OP_MOD"));
        assert_eq!(mod_top(false, false), s("OP_MOD"));
        assert_eq!(
            mod_from_altstack(true, true),
            s("OP_FROMALTSTACK OP_ROT OP_TUCK OP_MOD OP_OVER OP_ADD OP_OVER OP_MOD")
        );
    }

    #[test]
    fn bottom_constant_guard() {
        let q = BigInt::from(19);
        assert_eq!(
            verify_bottom_constant(&q),
            s("OP_DEPTH OP_1SUB OP_PICK 19 OP_EQUALVERIFY")
        );
    }

    #[test]
    fn literal_pushes() {
        let nums = [BigInt::from(0), BigInt::from(-1), BigInt::from(300)];
        assert_eq!(nums_to_script(&nums), s("OP_0 OP_1NEGATE 300"));
    }
}
