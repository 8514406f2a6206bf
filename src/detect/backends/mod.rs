pub mod replay;
pub mod stub;

pub use replay::ReplayBackend;
pub use stub::{StubBackend, StubScene};
