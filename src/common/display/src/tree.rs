use crate::DisplayLevel;

pub trait TreeDisplay {
    /// Describe the node in a human-readable way.
    /// The `level` parameter is used to determine how verbose the description should be.
    ///
    /// For example, a `level` of `DisplayLevel::Compact` might only show the name of the node,
    /// while a `level` of `DisplayLevel::Default` might show all available details.
    ///
    /// **Important**. Implementers do not need to worry about the formatting of the output.
    fn display_as(&self, level: DisplayLevel) -> String;

    /// Required method: Get the children of the self node.
    fn get_children(&self) -> Vec<&dyn TreeDisplay>;
}
