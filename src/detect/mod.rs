mod backend;
pub mod backends;
mod fps;
mod registry;
mod result;

pub use backend::DetectorBackend;
pub use backends::{ReplayBackend, StubBackend, StubScene};
pub use fps::FpsMeter;
pub use registry::{BackendRegistry, DEFAULT_MIN_CONFIDENCE};
pub use result::{Detection, RawDetection};
