pub(crate) mod node;
pub(crate) mod opts;
pub(crate) mod preview;
