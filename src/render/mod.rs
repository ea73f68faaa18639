pub(crate) mod frame;
pub(crate) mod instruction;
pub(crate) mod orient;
