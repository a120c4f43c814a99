//! Linked Queue and Stack
//!
//! [`Queue`] is a FIFO and [`Stack`] a LIFO, both storing owned strings.
//! Every operation is O(1). Popping an empty structure returns `None`
//! rather than an error; callers decide how to report it.

use std::collections::LinkedList;

/// First-in, first-out queue.
///
/// Backed by the standard linked list, so the head and tail are always
/// consistent: both are absent exactly when the queue is empty.
#[derive(Debug, Default, Clone)]
pub struct Queue {
    items: LinkedList<String>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `value` at the tail.
    pub fn push(&mut self, value: impl Into<String>) {
        self.items.push_back(value.into());
    }

    /// Removes and returns the value at the head, or `None` if empty.
    pub fn pop(&mut self) -> Option<String> {
        self.items.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

#[derive(Debug)]
struct Node {
    value: String,
    next: Option<Box<Node>>,
}

/// Last-in, first-out stack built from singly linked nodes.
#[derive(Debug, Default)]
pub struct Stack {
    head: Option<Box<Node>>,
    len: usize,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes `value`; it becomes the new head.
    pub fn push(&mut self, value: impl Into<String>) {
        let node = Box::new(Node {
            value: value.into(),
            next: self.head.take(),
        });
        self.head = Some(node);
        self.len += 1;
    }

    /// Removes and returns the most recently pushed value, or `None` if empty.
    pub fn pop(&mut self) -> Option<String> {
        self.head.take().map(|node| {
            let node = *node;
            self.head = node.next;
            self.len -= 1;
            node.value
        })
    }

    /// Returns the most recently pushed value without removing it.
    pub fn peek(&self) -> Option<&str> {
        self.head.as_deref().map(|node| node.value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn len(&self) -> usize {
        self.len
    }
}

impl Drop for Stack {
    // Unlink iteratively; the default drop recurses once per node.
    fn drop(&mut self) {
        let mut cursor = self.head.take();
        while let Some(mut node) = cursor {
            cursor = node.next.take();
        }
    }
}
