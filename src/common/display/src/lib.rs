pub mod ascii;
pub mod tree;
pub mod utils;

pub use tree::TreeDisplay;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DisplayLevel {
    /// Only the name of each node.
    Compact,
    /// Name plus the node's configuration.
    #[default]
    Default,
    /// Everything, including internal bookkeeping such as processor ids.
    Verbose,
}
