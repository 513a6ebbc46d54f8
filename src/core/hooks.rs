/// Called before every instruction with `(pc, opcode, operand_1, operand_2)`.
///
/// The operands are the two bytes following the opcode, whether or not the instruction uses them.
pub type ExecutionHook = Box<dyn FnMut(u16, u8, u8, u8)>;
/// Called on every CPU memory access with the kind of access, the address and the value read or written.
pub type MemoryHook = Box<dyn FnMut(MemoryAccess, u16, u8)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryAccess {
    Read,
    Write,
}

/// Identifies a registered hook so it can be removed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

/// A list of registered callbacks.
pub(crate) struct HookList<F: ?Sized> {
    next_id: u64,
    hooks: Vec<(HookId, Box<F>)>,
}

impl<F: ?Sized> Default for HookList<F> {
    fn default() -> Self {
        HookList {
            next_id: 0,
            hooks: Vec::new(),
        }
    }
}

impl<F: ?Sized> HookList<F> {
    pub fn add(&mut self, hook: Box<F>) -> HookId {
        let id = HookId(self.next_id);
        self.next_id += 1;
        self.hooks.push((id, hook));
        id
    }
    /// Remove a hook, returns `true` if it was registered.
    pub fn remove(&mut self, id: HookId) -> bool {
        let len = self.hooks.len();
        self.hooks.retain(|(i, _)| *i != id);
        self.hooks.len() != len
    }
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<F>> {
        self.hooks.iter_mut().map(|(_, h)| h)
    }
}
