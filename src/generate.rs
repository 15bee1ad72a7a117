pub(crate) mod engine;
pub(crate) mod sampler;
pub(crate) mod space;
