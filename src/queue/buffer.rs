use super::error::{QueueError, Result};
use std::collections::VecDeque;

/// Fixed-capacity FIFO of raw items
///
/// `capacity: None` means unbounded.
#[derive(Debug)]
pub struct BoundedBuffer<T> {
    items: VecDeque<T>,
    capacity: Option<usize>,
}

impl<T> BoundedBuffer<T> {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            // Don't preallocate huge capacities up front
            items: VecDeque::with_capacity(capacity.unwrap_or(0).min(1024)),
            capacity,
        }
    }

    pub fn is_full(&self) -> bool {
        self.capacity.is_some_and(|cap| self.items.len() >= cap)
    }

    /// Fail with `QueueFull` if another push would overflow
    pub fn ensure_room(&self) -> Result<()> {
        match self.capacity {
            Some(capacity) if self.items.len() >= capacity => {
                Err(QueueError::QueueFull { capacity })
            }
            _ => Ok(()),
        }
    }

    pub fn push(&mut self, item: T) -> Result<()> {
        self.ensure_room()?;
        self.items.push_back(item);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<T> {
        self.items.pop_front().ok_or(QueueError::QueueEmpty)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}
