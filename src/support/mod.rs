pub mod shutdown;
pub(crate) mod wire;
