use txscript::{Opcode, Script, ScriptItem};

/// Remove altstack round-trips and full `OP_ROT` cycles.
///
/// Cancelled patterns: `OP_TOALTSTACK OP_FROMALTSTACK`,
/// `OP_FROMALTSTACK OP_TOALTSTACK`, and `OP_ROT OP_ROT OP_ROT`. The scan
/// keeps a running tail so that removals can cascade.
pub fn optimise_script(script: Script) -> Script {
    use Opcode::*;
    const PATTERNS: [&[Opcode]; 3] = [
        &[OP_TOALTSTACK, OP_FROMALTSTACK],
        &[OP_FROMALTSTACK, OP_TOALTSTACK],
        &[OP_ROT, OP_ROT, OP_ROT],
    ];

    let mut out: Vec<ScriptItem> = Vec::with_capacity(script.len());
    for item in script.items() {
        out.push(item.clone());
        for pattern in PATTERNS {
            if out.len() < pattern.len() {
                continue;
            }
            let tail = &out[out.len() - pattern.len()..];
            let matches = tail
                .iter()
                .zip(pattern)
                .all(|(item, op)| matches!(item, ScriptItem::Op(o) if o == op));
            if matches {
                out.truncate(out.len() - pattern.len());
                break;
            }
        }
    }
    Script::from_items(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> Script {
        Script::parse_string(text).unwrap()
    }

    #[test]
    fn cancels_altstack_roundtrips() {
        assert_eq!(
            optimise_script(s("OP_ADD OP_TOALTSTACK OP_FROMALTSTACK OP_MUL")),
            s("OP_ADD OP_MUL")
        );
        assert_eq!(
            optimise_script(s("OP_FROMALTSTACK OP_TOALTSTACK")),
            Script::new()
        );
    }

    #[test]
    fn cancels_rot_cycles() {
        assert_eq!(optimise_script(s("OP_ROT OP_ROT OP_ROT OP_ADD")), s("OP_ADD"));
    }

    #[test]
    fn removals_cascade() {
        // the inner cancellation exposes an outer one
        assert_eq!(
            optimise_script(s("OP_TOALTSTACK OP_TOALTSTACK OP_FROMALTSTACK OP_FROMALTSTACK")),
            Script::new()
        );
    }

    #[test]
    fn leaves_other_code_alone() {
        let script = s("OP_TOALTSTACK OP_ADD OP_FROMALTSTACK");
        assert_eq!(optimise_script(script.clone()), script);
    }
}
