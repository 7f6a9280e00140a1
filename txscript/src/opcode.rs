use core::fmt;
use core::str::FromStr;

use crate::ScriptParseError;

macro_rules! opcodes {
    ($(($variant:ident, $byte:expr)),* $(,)?) => {
        /// A Bitcoin-script opcode.
        ///
        /// Only the opcodes the `zkscript` compiler emits are modelled; data
        /// pushes are represented separately by [`crate::ScriptItem::Push`].
        #[allow(non_camel_case_types)]
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum Opcode {
            $($variant),*
        }

        impl Opcode {
            /// The serialised byte of the opcode.
            pub fn to_byte(self) -> u8 {
                match self {
                    $(Opcode::$variant => $byte),*
                }
            }

            /// The opcode with the given serialised byte, if modelled.
            pub fn from_byte(byte: u8) -> Option<Self> {
                match byte {
                    $($byte => Some(Opcode::$variant),)*
                    _ => None,
                }
            }

            /// The canonical `OP_*` name.
            pub fn name(self) -> &'static str {
                match self {
                    $(Opcode::$variant => stringify!($variant)),*
                }
            }
        }

        impl FromStr for Opcode {
            type Err = ScriptParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($variant) => Ok(Opcode::$variant),)*
                    _ => Err(ScriptParseError::UnknownOpcode(s.into())),
                }
            }
        }
    };
}

opcodes! {
    (OP_0, 0x00),
    (OP_PUSHDATA1, 0x4c),
    (OP_PUSHDATA2, 0x4d),
    (OP_PUSHDATA4, 0x4e),
    (OP_1NEGATE, 0x4f),
    (OP_1, 0x51),
    (OP_2, 0x52),
    (OP_3, 0x53),
    (OP_4, 0x54),
    (OP_5, 0x55),
    (OP_6, 0x56),
    (OP_7, 0x57),
    (OP_8, 0x58),
    (OP_9, 0x59),
    (OP_10, 0x5a),
    (OP_11, 0x5b),
    (OP_12, 0x5c),
    (OP_13, 0x5d),
    (OP_14, 0x5e),
    (OP_15, 0x5f),
    (OP_16, 0x60),
    (OP_NOP, 0x61),
    (OP_IF, 0x63),
    (OP_NOTIF, 0x64),
    (OP_ELSE, 0x67),
    (OP_ENDIF, 0x68),
    (OP_VERIFY, 0x69),
    (OP_RETURN, 0x6a),
    (OP_TOALTSTACK, 0x6b),
    (OP_FROMALTSTACK, 0x6c),
    (OP_2DROP, 0x6d),
    (OP_2DUP, 0x6e),
    (OP_3DUP, 0x6f),
    (OP_2OVER, 0x70),
    (OP_2ROT, 0x71),
    (OP_2SWAP, 0x72),
    (OP_IFDUP, 0x73),
    (OP_DEPTH, 0x74),
    (OP_DROP, 0x75),
    (OP_DUP, 0x76),
    (OP_NIP, 0x77),
    (OP_OVER, 0x78),
    (OP_PICK, 0x79),
    (OP_ROLL, 0x7a),
    (OP_ROT, 0x7b),
    (OP_SWAP, 0x7c),
    (OP_TUCK, 0x7d),
    (OP_CAT, 0x7e),
    (OP_SPLIT, 0x7f),
    (OP_SIZE, 0x82),
    (OP_EQUAL, 0x87),
    (OP_EQUALVERIFY, 0x88),
    (OP_1ADD, 0x8b),
    (OP_1SUB, 0x8c),
    (OP_NEGATE, 0x8f),
    (OP_ABS, 0x90),
    (OP_NOT, 0x91),
    (OP_0NOTEQUAL, 0x92),
    (OP_ADD, 0x93),
    (OP_SUB, 0x94),
    (OP_MUL, 0x95),
    (OP_DIV, 0x96),
    (OP_MOD, 0x97),
    (OP_BOOLAND, 0x9a),
    (OP_BOOLOR, 0x9b),
    (OP_NUMEQUAL, 0x9c),
    (OP_NUMEQUALVERIFY, 0x9d),
    (OP_LESSTHAN, 0x9f),
    (OP_GREATERTHAN, 0xa0),
    (OP_MIN, 0xa3),
    (OP_MAX, 0xa4),
    (OP_WITHIN, 0xa5),
    (OP_SHA256, 0xa8),
    (OP_HASH160, 0xa9),
    (OP_HASH256, 0xaa),
    (OP_CHECKSIG, 0xac),
    (OP_CHECKSIGVERIFY, 0xad),
}

impl Opcode {
    /// The `OP_1`..`OP_16` small-integer opcode for `n` in `1..=16`.
    pub fn small_int(n: u8) -> Option<Self> {
        if (1..=16).contains(&n) {
            Opcode::from_byte(0x50 + n)
        } else {
            None
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_name() {
        for byte in 0u8..=0xff {
            if let Some(op) = Opcode::from_byte(byte) {
                assert_eq!(op.name().parse::<Opcode>().unwrap(), op);
                assert_eq!(op.to_byte(), byte);
            }
        }
    }

    #[test]
    fn small_ints() {
        assert_eq!(Opcode::small_int(1), Some(Opcode::OP_1));
        assert_eq!(Opcode::small_int(16), Some(Opcode::OP_16));
        assert_eq!(Opcode::small_int(0), None);
        assert_eq!(Opcode::small_int(17), None);
    }
}
