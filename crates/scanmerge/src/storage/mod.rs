pub mod disposal;
pub mod shard;

pub use disposal::SourceDisposer;
pub use shard::{shard_name, Allocation, ShardAllocator, ShardSnapshot, ShardState};
