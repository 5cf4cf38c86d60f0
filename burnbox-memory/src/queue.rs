// Copyright 2026 burnbox Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::VecDeque;

/// Position of an element pushed into an [`OrderQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token(u64);

/// A FIFO queue that supports random lazy element removal.
///
/// Removed elements leave a hole that is skipped when it reaches either end of the queue, so push, pop and remove are
/// all O(1) amortized.
#[derive(Debug)]
pub struct OrderQueue<T> {
    slots: VecDeque<Option<T>>,

    /// Global sequence number of the front slot.
    offset: u64,
    /// Actual element count, holes excluded.
    len: usize,
}

impl<T> Default for OrderQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> OrderQueue<T> {
    /// Create an empty [`OrderQueue`].
    pub fn new() -> Self {
        Self {
            slots: VecDeque::new(),
            offset: 0,
            len: 0,
        }
    }

    /// Push an element to the tail of the queue.
    ///
    /// Returns a token that can be used for random removal.
    pub fn push(&mut self, elem: T) -> Token {
        let token = Token(self.offset + self.slots.len() as u64);
        self.slots.push_back(Some(elem));
        self.len += 1;
        token
    }

    /// Returns the oldest element.
    pub fn peek(&self) -> Option<&T> {
        // The front slot is never a hole.
        self.slots.front().and_then(Option::as_ref)
    }

    /// Pop the oldest element.
    pub fn pop(&mut self) -> Option<T> {
        let elem = self.slots.pop_front()?;
        self.offset += 1;
        self.compact();
        if elem.is_some() {
            self.len -= 1;
        }
        elem
    }

    /// Remove the element with the given `token`.
    ///
    /// Returns `None` if the element has already been popped or removed.
    pub fn remove(&mut self, token: Token) -> Option<T> {
        let pos = usize::try_from(token.0.checked_sub(self.offset)?).ok()?;
        let elem = self.slots.get_mut(pos)?.take()?;
        self.len -= 1;
        self.compact();
        Some(elem)
    }

    /// Returns the actual element count.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if there is no element in the queue.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the occupied slots of the queue, holes included.
    #[cfg(test)]
    pub fn usage(&self) -> usize {
        self.slots.len()
    }

    /// Iterate the elements from the oldest to the newest, skipping holes.
    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().flatten()
    }

    fn compact(&mut self) {
        while matches!(self.slots.front(), Some(None)) {
            self.slots.pop_front();
            self.offset += 1;
        }
        while matches!(self.slots.back(), Some(None)) {
            self.slots.pop_back();
        }
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;

    #[test]
    fn test_order_queue() {
        let mut queue = OrderQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.peek(), None);

        assert_eq!(queue.push(0), Token(0));
        assert_eq!(queue.push(1), Token(1));
        assert_eq!(queue.push(2), Token(2));
        assert_eq!(queue.push(3), Token(3));
        assert_eq!(queue.len(), 4);

        assert_eq!(queue.pop(), Some(0));
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.usage(), 2);

        assert_eq!(queue.push(4), Token(4));
        assert_eq!(queue.push(5), Token(5));
        assert_eq!(queue.push(6), Token(6));

        assert_eq!(queue.remove(Token(3)), Some(3));
        assert_eq!(queue.remove(Token(4)), Some(4));
        assert_eq!(queue.remove(Token(5)), Some(5));
        assert_eq!(queue.len(), 2);
        // Holes in the middle stay until they reach an end.
        assert_eq!(queue.usage(), 5);

        assert_eq!(queue.peek(), Some(&2));
        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.usage(), 1);
        assert_eq!(queue.peek(), Some(&6));
    }

    #[test]
    fn test_order_queue_stale_token() {
        let mut queue = OrderQueue::new();
        let t0 = queue.push("a");
        let t1 = queue.push("b");

        assert_eq!(queue.pop(), Some("a"));
        assert_eq!(queue.remove(t0), None);

        assert_eq!(queue.remove(t1), Some("b"));
        assert_eq!(queue.remove(t1), None);
        assert!(queue.is_empty());
        assert_eq!(queue.usage(), 0);

        assert_eq!(queue.push("c"), Token(2));
        assert_eq!(queue.remove(Token(7)), None);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_order_queue_keeps_insertion_order() {
        let mut queue = OrderQueue::new();
        let tokens = (0..16).map(|i| queue.push(i)).collect_vec();
        for token in tokens.iter().skip(1).step_by(3) {
            queue.remove(*token);
        }

        let mut popped = vec![];
        while let Some(elem) = queue.pop() {
            popped.push(elem);
        }
        let expected = (0..16).filter(|i| i % 3 != 1).collect_vec();
        assert_eq!(popped, expected);
        assert_eq!(queue.usage(), 0);
    }
}
