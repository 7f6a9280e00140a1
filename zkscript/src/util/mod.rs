//! Opcode-level helpers shared by every builder.

mod bitmask;
mod numeric;
mod optimise;
mod scripts;
mod slots;

pub use bitmask::{bitmask_to_boolean_list, boolean_list_to_bitmask};
pub use numeric::{fq2_value_mul, fq2_value_pow, from_montgomery_768, limbs_to_bigint, to_naf};
pub use optimise::optimise_script;
pub(crate) use slots::Slots;
pub use scripts::{
    is_equal_to, is_mod_equal_to, mod_from_altstack, mod_top, mod_with_preparation, move_element,
    move_slice, nums_to_script, pick, roll, verify_bottom_constant, MoveMode,
};
