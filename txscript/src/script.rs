use core::fmt;
use core::ops::{Add, AddAssign};

use num_bigint::BigInt;
use num_traits::Zero;
use thiserror::Error;

use crate::{encode_num, Opcode};

/// Error raised when parsing a script from its string form.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScriptParseError {
    /// The token does not name a modelled opcode.
    #[error("unknown opcode `{0}`")]
    UnknownOpcode(String),
    /// The token is not an opcode, a hex push, or a decimal literal.
    #[error("malformed token `{0}`")]
    MalformedToken(String),
}

/// A single entry of a script: an opcode or a raw data push.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScriptItem {
    /// An opcode.
    Op(Opcode),
    /// A data push, serialised with the minimal push prefix.
    Push(Vec<u8>),
}

/// An ordered sequence of opcodes and data pushes.
///
/// Concatenation is monoidal (`+`, `+=`), equality is structural, and
/// [`Script::serialize`] produces the raw byte form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Script {
    items: Vec<ScriptItem>,
}

impl Script {
    /// The empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a whitespace-separated sequence of `OP_*` names, `0x`-prefixed
    /// hex pushes, and decimal integer literals.
    pub fn parse_string(s: &str) -> Result<Self, ScriptParseError> {
        let mut out = Script::new();
        for token in s.split_whitespace() {
            if let Some(hex_digits) = token.strip_prefix("0x") {
                let bytes = hex::decode(hex_digits)
                    .map_err(|_| ScriptParseError::MalformedToken(token.into()))?;
                out.items.push(ScriptItem::Push(bytes));
            } else if token.starts_with("OP_") {
                out.items.push(ScriptItem::Op(token.parse()?));
            } else if let Ok(n) = token.parse::<i128>() {
                out.push_int(&BigInt::from(n));
            } else {
                return Err(ScriptParseError::MalformedToken(token.into()));
            }
        }
        Ok(out)
    }

    /// Append an opcode.
    pub fn push_opcode(&mut self, op: Opcode) {
        self.items.push(ScriptItem::Op(op));
    }

    /// Append a raw data push.
    pub fn push_slice(&mut self, bytes: impl Into<Vec<u8>>) {
        self.items.push(ScriptItem::Push(bytes.into()));
    }

    /// Append the minimal push of an integer: `OP_0`, `OP_1NEGATE`,
    /// `OP_1`..`OP_16`, or a script-number data push.
    pub fn push_int(&mut self, n: &BigInt) {
        if n.is_zero() {
            self.push_opcode(Opcode::OP_0);
        } else if *n == BigInt::from(-1) {
            self.push_opcode(Opcode::OP_1NEGATE);
        } else if let Some(op) = u8::try_from(n.clone()).ok().and_then(Opcode::small_int) {
            self.push_opcode(op);
        } else {
            self.push_slice(encode_num(n));
        }
    }

    /// A script holding a single opcode.
    pub fn from_opcode(op: Opcode) -> Self {
        let mut out = Script::new();
        out.push_opcode(op);
        out
    }

    /// A script holding the given opcodes in order.
    pub fn from_opcodes(ops: &[Opcode]) -> Self {
        let mut out = Script::new();
        for &op in ops {
            out.push_opcode(op);
        }
        out
    }

    /// Number of items (opcodes + pushes).
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the script holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over the items.
    pub fn iter(&self) -> impl Iterator<Item = &ScriptItem> {
        self.items.iter()
    }

    /// The items as a slice.
    pub fn items(&self) -> &[ScriptItem] {
        &self.items
    }

    /// Replace the items wholesale.
    pub fn from_items(items: Vec<ScriptItem>) -> Self {
        Script { items }
    }

    /// Count the occurrences of an opcode.
    pub fn count_op(&self, op: Opcode) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item, ScriptItem::Op(o) if *o == op))
            .count()
    }

    /// Serialise to raw bytes with minimal push prefixes.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for item in &self.items {
            match item {
                ScriptItem::Op(op) => out.push(op.to_byte()),
                ScriptItem::Push(bytes) => {
                    let len = bytes.len();
                    if len < 0x4c {
                        out.push(len as u8);
                    } else if len <= 0xff {
                        out.push(Opcode::OP_PUSHDATA1.to_byte());
                        out.push(len as u8);
                    } else if len <= 0xffff {
                        out.push(Opcode::OP_PUSHDATA2.to_byte());
                        out.extend_from_slice(&(len as u16).to_le_bytes());
                    } else {
                        out.push(Opcode::OP_PUSHDATA4.to_byte());
                        out.extend_from_slice(&(len as u32).to_le_bytes());
                    }
                    out.extend_from_slice(bytes);
                }
            }
        }
        out
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match item {
                ScriptItem::Op(op) => write!(f, "{op}")?,
                ScriptItem::Push(bytes) => write!(f, "0x{}", hex::encode(bytes))?,
            }
        }
        Ok(())
    }
}

impl Add for Script {
    type Output = Script;

    fn add(mut self, rhs: Script) -> Script {
        self.items.extend(rhs.items);
        self
    }
}

impl AddAssign for Script {
    fn add_assign(&mut self, rhs: Script) {
        self.items.extend(rhs.items);
    }
}

impl Extend<ScriptItem> for Script {
    fn extend<T: IntoIterator<Item = ScriptItem>>(&mut self, iter: T) {
        self.items.extend(iter);
    }
}

impl FromIterator<ScriptItem> for Script {
    fn from_iter<T: IntoIterator<Item = ScriptItem>>(iter: T) -> Self {
        Script {
            items: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let script = Script::parse_string("OP_DUP OP_MUL 0x00 OP_TOALTSTACK").unwrap();
        assert_eq!(script.len(), 4);
        assert_eq!(script.to_string(), "OP_DUP OP_MUL 0x00 OP_TOALTSTACK");
    }

    #[test]
    fn parse_decimal_literals() {
        let script = Script::parse_string("0 1 16 17 -1").unwrap();
        assert_eq!(
            script.items(),
            &[
                ScriptItem::Op(Opcode::OP_0),
                ScriptItem::Op(Opcode::OP_1),
                ScriptItem::Op(Opcode::OP_16),
                ScriptItem::Push(vec![17]),
                ScriptItem::Op(Opcode::OP_1NEGATE),
            ]
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            Script::parse_string("OP_BOGUS"),
            Err(ScriptParseError::UnknownOpcode(_))
        ));
        assert!(matches!(
            Script::parse_string("zzz"),
            Err(ScriptParseError::MalformedToken(_))
        ));
    }

    #[test]
    fn concatenation_is_monoidal() {
        let a = Script::parse_string("OP_ADD").unwrap();
        let b = Script::parse_string("OP_SUB OP_MUL").unwrap();
        let ab = a.clone() + b.clone();
        assert_eq!(ab.len(), 3);
        let mut c = a.clone();
        c += b;
        assert_eq!(ab, c);
        assert_eq!(a + Script::new(), Script::parse_string("OP_ADD").unwrap());
    }

    #[test]
    fn serialisation() {
        let mut script = Script::new();
        script.push_opcode(Opcode::OP_DUP);
        script.push_slice(vec![0xab, 0xcd]);
        script.push_opcode(Opcode::OP_EQUALVERIFY);
        assert_eq!(script.serialize(), vec![0x76, 0x02, 0xab, 0xcd, 0x88]);
    }

    #[test]
    fn long_push_prefixes() {
        let mut script = Script::new();
        script.push_slice(vec![0u8; 0x4c]);
        let bytes = script.serialize();
        assert_eq!(bytes[0], 0x4c); // OP_PUSHDATA1
        assert_eq!(bytes[1], 0x4c);

        let mut script = Script::new();
        script.push_slice(vec![0u8; 0x100]);
        let bytes = script.serialize();
        assert_eq!(bytes[0], 0x4d); // OP_PUSHDATA2
        assert_eq!(&bytes[1..3], &[0x00, 0x01]);
    }

    #[test]
    fn push_int_boundaries() {
        let mut script = Script::new();
        script.push_int(&BigInt::from(16));
        script.push_int(&BigInt::from(127));
        assert_eq!(
            script.items(),
            &[
                ScriptItem::Op(Opcode::OP_16),
                ScriptItem::Push(vec![0x7f]),
            ]
        );
    }
}
