pub(crate) mod coordinator;
pub(crate) mod descriptor;
pub(crate) mod store;
