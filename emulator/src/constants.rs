pub type Address = u16;
pub type Word = u16;
pub type Byte = u8;

/// Total size of the computer memory, in bytes
pub const MEMORY_SIZE: usize = 64 * 1024;

/// Where the loader copies the program, and where %pc points on startup
pub const CODE_START: Address = 0x8000;

/// Start of the stack pointer
pub const STACK_START: Address = 0x05FF;

/// Lowest address the stack is expected to grow to
pub const STACK_END: Address = 0x0200;
