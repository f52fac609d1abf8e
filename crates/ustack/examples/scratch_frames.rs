//! Walks a small tree with one stack frame per level and logs page traffic.
//!
//! Run with `RUST_LOG=ustack=debug cargo run --example scratch_frames`.

use tracing_subscriber::EnvFilter;
use ustack::prelude::*;

struct Node {
    name: &'static str,
    children: Vec<Node>,
}

fn visit(stack: &mut StackAllocator<ReservedHeap>, node: &Node, level: usize) -> ustack::Result<()> {
    let mut frame = stack.frame();

    // Scratch buffer for this level's label
    let label = frame.allocate(node.name.len())?;
    // SAFETY: the buffer is live for the rest of this frame and sized for the name.
    unsafe {
        label
            .cast::<u8>()
            .as_ptr()
            .copy_from_nonoverlapping(node.name.as_ptr(), node.name.len());
    }
    frame.allocate(480)?;

    println!(
        "{:indent$}{} (depth {}, {} bytes used, {} page(s))",
        "",
        node.name,
        frame.depth(),
        frame.used(),
        frame.pages_held(),
        indent = level * 2
    );

    for child in &node.children {
        visit(&mut frame, child, level + 1)?;
    }
    Ok(())
}

fn leaf(name: &'static str) -> Node {
    Node {
        name,
        children: Vec::new(),
    }
}

fn main() -> ustack::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let tree = Node {
        name: "root",
        children: vec![
            Node {
                name: "left",
                children: vec![
                    leaf("left.a"),
                    Node {
                        name: "left.b",
                        children: vec![leaf("left.b.x"), leaf("left.b.y")],
                    },
                ],
            },
            leaf("right"),
        ],
    };

    let mut stack = StackAllocator::new(ReservedHeap::new(16)?)?;
    visit(&mut stack, &tree, 0)?;

    println!("{}", stack.stats());
    Ok(())
}
