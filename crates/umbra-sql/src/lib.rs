#[macro_use]
pub mod serializer;
pub use serializer::{Params, Placeholder};

pub mod compiler;
pub use compiler::{Compiler, GarbageCollectPlan, ShadowSweep};

mod decode;
pub use decode::decode_row;
