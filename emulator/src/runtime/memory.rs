use crate::constants::{Address, Byte, Word, MEMORY_SIZE};

/// Holds the memory of the computer.
///
/// It has 65536 byte-addressable cells. Words are stored little-endian, and
/// every address computation wraps around the 16-bit address space, so no
/// access can ever be out of bounds.
pub struct Memory {
    inner: Box<[Byte; MEMORY_SIZE]>,
}

// Implement clone without going through the stack
impl Clone for Memory {
    fn clone(&self) -> Self {
        let mut new = Self::default();
        new.inner.copy_from_slice(self.inner.as_slice());
        new
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            inner: vec![0; MEMORY_SIZE]
                .into_boxed_slice()
                .try_into()
                .expect("memory buffer has the right size"),
        }
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Memory([{MEMORY_SIZE} bytes])")
    }
}

impl Memory {
    /// Read a single byte
    #[must_use]
    pub fn get_byte(&self, address: Address) -> Byte {
        self.inner[usize::from(address)]
    }

    /// Write a single byte, leaving its neighbours untouched
    pub fn set_byte(&mut self, address: Address, value: Byte) {
        self.inner[usize::from(address)] = value;
    }

    /// Read a little-endian word: low byte at `address`, high byte right after
    #[must_use]
    pub fn get_word(&self, address: Address) -> Word {
        let low = self.get_byte(address);
        let high = self.get_byte(address.wrapping_add(1));
        Word::from_le_bytes([low, high])
    }

    /// Write a little-endian word
    pub fn set_word(&mut self, address: Address, value: Word) {
        let [low, high] = value.to_le_bytes();
        self.set_byte(address, low);
        self.set_byte(address.wrapping_add(1), high);
    }

    /// Copy a slice of bytes starting at `address`.
    ///
    /// The caller is responsible for checking that the slice fits before the
    /// end of the address space.
    pub(crate) fn copy_from(&mut self, address: Address, bytes: &[Byte]) {
        let start = usize::from(address);
        self.inner[start..start + bytes.len()].copy_from_slice(bytes);
    }
}
