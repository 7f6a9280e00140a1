/// Stack-position bookkeeping for emissions juggling several
/// intermediates.
///
/// Each slot records the depth of the deepest scalar of a live value and
/// its width in scalars; consumed slots turn `None`. Only relative
/// movements are tracked: the emitters remain responsible for the opcodes.
pub(crate) struct Slots {
    default_width: i64,
    pos: Vec<Option<(i64, i64)>>,
}

impl Slots {
    pub fn new(default_width: usize) -> Self {
        Slots {
            default_width: default_width as i64,
            pos: Vec::new(),
        }
    }

    /// Register a value already on the stack at `position`, with the
    /// default width.
    pub fn register(&mut self, position: i64) -> usize {
        self.register_wide(position, self.default_width as usize)
    }

    /// Register a value already on the stack with an explicit width.
    pub fn register_wide(&mut self, position: i64, width: usize) -> usize {
        self.pos.push(Some((position, width as i64)));
        self.pos.len() - 1
    }

    /// Record a fresh default-width value pushed on top of the stack.
    pub fn alloc_on_top(&mut self) -> usize {
        self.alloc_on_top_wide(self.default_width as usize)
    }

    /// Record a fresh value of the given width pushed on top of the stack.
    pub fn alloc_on_top_wide(&mut self, width: usize) -> usize {
        self.lift(width as i64);
        self.register_wide(width as i64 - 1, width)
    }

    /// Shift every live slot by `k` (positive for pushes above them).
    pub fn lift(&mut self, k: i64) {
        for p in self.pos.iter_mut().flatten() {
            p.0 += k;
        }
    }

    pub fn get(&self, i: usize) -> i64 {
        self.pos[i].expect("slot already consumed").0
    }

    pub fn width(&self, i: usize) -> usize {
        self.pos[i].expect("slot already consumed").1 as usize
    }

    /// Record the removal of slot `i`: slots deeper than it lose the
    /// scalars that sat above them.
    pub fn consume(&mut self, i: usize) {
        let (at, width) = self.pos[i].expect("slot already consumed");
        self.pos[i] = None;
        for p in self.pos.iter_mut().flatten() {
            if p.0 > at {
                p.0 -= width;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_consume_bookkeeping() {
        let mut slots = Slots::new(2);
        let a = slots.register(3); // depths 2..3
        let b = slots.register(1); // depths 0..1
        let c = slots.alloc_on_top();
        assert_eq!(slots.get(a), 5);
        assert_eq!(slots.get(b), 3);
        assert_eq!(slots.get(c), 1);
        // removing b: a (deeper) loses two scalars, c (shallower) does not
        slots.consume(b);
        assert_eq!(slots.get(a), 3);
        assert_eq!(slots.get(c), 1);
    }

    #[test]
    fn mixed_widths() {
        let mut slots = Slots::new(2);
        let pair = slots.register(1);
        let scalar = slots.alloc_on_top_wide(1);
        assert_eq!(slots.get(pair), 2);
        assert_eq!(slots.get(scalar), 0);
        assert_eq!(slots.width(scalar), 1);
        slots.consume(scalar);
        assert_eq!(slots.get(pair), 1);
    }
}
