// # Record Store Implementations
//
// Local implementations of the RecordStore trait. The production store
// (Supabase) lives in its own crate.

pub mod file;
pub mod memory;

pub use file::FileRecordStore;
pub use memory::MemoryRecordStore;
