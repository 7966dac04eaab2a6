use std::fmt::Debug;

/// Linux exposes the device tree it booted with as a virtual filesystem: one directory per
/// node and one file per property, holding the raw property value. This trait abstracts that
/// filesystem to allow it to be mocked.
///
/// Node paths are absolute device tree paths such as `/reserved-memory/serial@3fff0000`, with
/// `/` being the root node. All I/O is synchronous and blocking because the data never comes
/// from a real storage device.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait DeviceTree: Debug + Send + Sync + 'static {
    /// Gets the raw value of property `name` of the node at `node_path`, or `None` if the node
    /// or the property does not exist.
    fn read_property(&self, node_path: &str, name: &str) -> Option<Vec<u8>>;

    /// Gets the names of the child nodes of the node at `node_path`, sorted by name.
    ///
    /// A node that does not exist has no children.
    fn child_nodes(&self, node_path: &str) -> Vec<String>;
}
