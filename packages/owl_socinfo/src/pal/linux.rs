mod bindings;
pub(crate) use bindings::*;

mod device_tree;
pub(crate) use device_tree::*;

mod platform;
pub(crate) use platform::*;
