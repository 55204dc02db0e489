use std::fmt::{self, Write};

use crate::{tree::TreeDisplay, DisplayLevel};

/// Render a tree of nodes git-log style, one node per block, children indented below.
pub fn fmt_tree_gitstyle<'a, W: Write + 'a>(
    node: &dyn TreeDisplay,
    depth: usize,
    s: &'a mut W,
    level: DisplayLevel,
) -> fmt::Result {
    let desc = node.display_as(level);
    let lines = desc.lines().filter(|l| !l.is_empty());
    let prefix = "| ".repeat(depth);
    for (i, line) in lines.enumerate() {
        if i == 0 {
            writeln!(s, "{prefix}* {line}")?;
        } else {
            writeln!(s, "{prefix}|   {line}")?;
        }
    }

    let children = node.get_children();
    if children.is_empty() {
        return Ok(());
    }
    writeln!(s, "{prefix}|")?;
    for child in children {
        fmt_tree_gitstyle(child, depth + 1, s, level)?;
    }
    Ok(())
}

/// Convenience wrapper around [`fmt_tree_gitstyle`] that returns the rendered tree.
pub fn render_tree(node: &dyn TreeDisplay, level: DisplayLevel) -> Result<String, fmt::Error> {
    let mut out = String::new();
    fmt_tree_gitstyle(node, 0, &mut out, level)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Node {
        name: &'static str,
        detail: &'static str,
        children: Vec<Node>,
    }

    impl TreeDisplay for Node {
        fn display_as(&self, level: DisplayLevel) -> String {
            match level {
                DisplayLevel::Compact => self.name.to_string(),
                _ => format!("{}\n{}", self.name, self.detail),
            }
        }

        fn get_children(&self) -> Vec<&dyn TreeDisplay> {
            self.children.iter().map(|c| c as &dyn TreeDisplay).collect()
        }
    }

    #[test]
    fn renders_nested_nodes() -> fmt::Result {
        let tree = Node {
            name: "Join",
            detail: "Shape = BuildThenProbe",
            children: vec![Node {
                name: "Source",
                detail: "Streams = 2",
                children: vec![],
            }],
        };
        let rendered = render_tree(&tree, DisplayLevel::Default)?;
        let expected = "* Join\n|   Shape = BuildThenProbe\n|\n| * Source\n| |   Streams = 2\n";
        assert_eq!(rendered, expected);

        let compact = render_tree(&tree, DisplayLevel::Compact)?;
        assert_eq!(compact, "* Join\n|\n| * Source\n");
        Ok(())
    }
}
