//! Block arena backing compiled programs.
//!
//! Instructions live in fixed-capacity blocks and are addressed by
//! [`Addr`] handles instead of pointers. A block's backing `Vec` is created
//! with its final capacity and never grows, so a handle stays valid for the
//! lifetime of the arena. When the tail block is full a new one is appended
//! with double the capacity (capped at [`MAX_BLOCK_SLOTS`]).
//!
//! Consecutive allocations are reachable through [`Blocks::successor`],
//! which steps into the next block transparently. Interpreters walk a stream
//! by repeatedly taking the successor, so no bridging jump is needed at block
//! boundaries.
//!
//! String data lives in [`TextBlocks`], a parallel list of byte blocks.

use std::ops::Index;

use kmk_ir::static_assert_size;

/// Largest number of instructions in one block.
pub const MAX_BLOCK_SLOTS: usize = 4096;

/// Largest text block allocated by doubling; longer strings get a block of
/// their own exact size.
pub const MAX_TEXT_BLOCK: usize = 64 * 1024;

/// Handle of one instruction inside a [`Blocks`] arena.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Addr {
    block: u32,
    slot: u32,
}

static_assert_size!(Addr, 8);

impl Addr {
    /// Placeholder for jump targets that are patched later.
    pub const PENDING: Addr = Addr {
        block: u32::MAX,
        slot: u32::MAX,
    };

    pub fn is_pending(self) -> bool {
        self == Addr::PENDING
    }

    pub fn block(self) -> u32 {
        self.block
    }

    pub fn slot(self) -> u32 {
        self.slot
    }
}

impl std::fmt::Display for Addr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_pending() {
            write!(f, "@pending")
        } else {
            write!(f, "@{}.{}", self.block, self.slot)
        }
    }
}

fn to_u32(v: usize) -> u32 {
    u32::try_from(v).unwrap_or(u32::MAX)
}

/// Size statistics of one arena.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct ArenaStats {
    pub blocks: usize,
    pub bytes: usize,
    pub instructions: usize,
}

impl std::ops::Add for ArenaStats {
    type Output = ArenaStats;

    fn add(self, rhs: ArenaStats) -> ArenaStats {
        ArenaStats {
            blocks: self.blocks + rhs.blocks,
            bytes: self.bytes + rhs.bytes,
            instructions: self.instructions + rhs.instructions,
        }
    }
}

/// Append-only block list of instructions.
#[derive(Debug)]
pub struct Blocks<T> {
    blocks: Vec<Vec<T>>,
    next_capacity: usize,
    len: usize,
}

impl<T> Blocks<T> {
    /// Create the first block, sized from `hint` so typical programs fit in
    /// one block.
    pub fn with_capacity(hint: usize) -> Self {
        let first = hint.clamp(1, MAX_BLOCK_SLOTS);
        Blocks {
            blocks: vec![Vec::with_capacity(first)],
            next_capacity: first,
            len: 0,
        }
    }

    fn tail_is_full(&self) -> bool {
        self.blocks.last().map_or(true, |b| b.len() == b.capacity())
    }

    /// Append `item`, starting a new block if the tail block is full.
    pub fn alloc(&mut self, item: T) -> Addr {
        if self.tail_is_full() {
            self.next_capacity = (self.next_capacity * 2).min(MAX_BLOCK_SLOTS);
            self.blocks.push(Vec::with_capacity(self.next_capacity));
        }
        let block = self.blocks.len() - 1;
        let tail = &mut self.blocks[block];
        let slot = tail.len();
        tail.push(item);
        self.len += 1;
        Addr {
            block: to_u32(block),
            slot: to_u32(slot),
        }
    }

    /// Address the next [`alloc`](Self::alloc) will return.
    pub fn next_addr(&self) -> Addr {
        if self.tail_is_full() {
            Addr {
                block: to_u32(self.blocks.len()),
                slot: 0,
            }
        } else {
            let block = self.blocks.len() - 1;
            Addr {
                block: to_u32(block),
                slot: to_u32(self.blocks[block].len()),
            }
        }
    }

    /// Address allocated right after `addr`.
    pub fn successor(&self, addr: Addr) -> Addr {
        let block = &self.blocks[addr.block as usize];
        if (addr.slot as usize) + 1 < block.capacity() {
            Addr {
                block: addr.block,
                slot: addr.slot + 1,
            }
        } else {
            Addr {
                block: addr.block + 1,
                slot: 0,
            }
        }
    }

    pub fn get(&self, addr: Addr) -> Option<&T> {
        self.blocks.get(addr.block as usize)?.get(addr.slot as usize)
    }

    /// Mutable access, used only to patch forward jump targets during
    /// compilation.
    pub fn get_mut(&mut self, addr: Addr) -> Option<&mut T> {
        self.blocks
            .get_mut(addr.block as usize)?
            .get_mut(addr.slot as usize)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Every instruction with its address, in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (Addr, &T)> {
        self.blocks.iter().enumerate().flat_map(|(b, block)| {
            block.iter().enumerate().map(move |(s, item)| {
                (
                    Addr {
                        block: to_u32(b),
                        slot: to_u32(s),
                    },
                    item,
                )
            })
        })
    }

    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            blocks: self.blocks.len(),
            bytes: self
                .blocks
                .iter()
                .map(|b| b.capacity() * std::mem::size_of::<T>())
                .sum(),
            instructions: self.len,
        }
    }

    /// Release every block at once.
    pub fn free_all(&mut self) {
        self.blocks.clear();
        self.len = 0;
    }
}

impl<T> Index<Addr> for Blocks<T> {
    type Output = T;

    fn index(&self, addr: Addr) -> &T {
        &self.blocks[addr.block as usize][addr.slot as usize]
    }
}

/// Handle of a string copied into a [`TextBlocks`] arena.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct TextId {
    block: u32,
    start: u32,
    len: u32,
}

static_assert_size!(TextId, 12);

impl TextId {
    pub const EMPTY: TextId = TextId {
        block: 0,
        start: 0,
        len: 0,
    };

    pub fn len(self) -> usize {
        self.len as usize
    }

    pub fn is_empty(self) -> bool {
        self.len == 0
    }
}

/// Byte blocks holding string copies.
#[derive(Debug)]
pub struct TextBlocks {
    blocks: Vec<String>,
    next_capacity: usize,
}

impl TextBlocks {
    pub fn with_capacity(hint: usize) -> Self {
        let first = hint.clamp(16, MAX_TEXT_BLOCK);
        TextBlocks {
            blocks: vec![String::with_capacity(first)],
            next_capacity: first,
        }
    }

    /// Copy `text` into the arena. A string never spans two blocks.
    pub fn dup(&mut self, text: &str) -> TextId {
        if text.is_empty() {
            return TextId::EMPTY;
        }
        let fits = self
            .blocks
            .last()
            .is_some_and(|b| b.capacity() - b.len() >= text.len());
        if !fits {
            let capacity = if text.len() > MAX_TEXT_BLOCK {
                text.len()
            } else {
                let mut capacity = self.next_capacity;
                while capacity < text.len() {
                    capacity *= 2;
                }
                self.next_capacity = (capacity * 2).min(MAX_TEXT_BLOCK);
                capacity.min(MAX_TEXT_BLOCK)
            };
            self.blocks.push(String::with_capacity(capacity));
        }
        let block = self.blocks.len() - 1;
        let tail = &mut self.blocks[block];
        let start = tail.len();
        tail.push_str(text);
        TextId {
            block: to_u32(block),
            start: to_u32(start),
            len: to_u32(text.len()),
        }
    }

    pub fn get(&self, id: TextId) -> &str {
        if id.is_empty() {
            return "";
        }
        let start = id.start as usize;
        self.blocks
            .get(id.block as usize)
            .and_then(|b| b.get(start..start + id.len as usize))
            .unwrap_or("")
    }

    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            blocks: self.blocks.len(),
            bytes: self.blocks.iter().map(String::capacity).sum(),
            instructions: 0,
        }
    }

    pub fn free_all(&mut self) {
        self.blocks.clear();
    }
}
