//! Run-compressed id → position map
//!
//! The document is described as a sequence of anchors in position order.
//! Each anchor is a run of consecutive positions whose identifiers are
//! consecutive too, so one anchor stands for any number of untouched nodes
//! and its addend (position − identifier) is the same for the whole run.
//! A single inserted node is a run of length one: its addend is the one-off
//! correction for that identifier.
//!
//! For an unbounded map the nodes after the last anchor form an implicit
//! identity tail starting at identifier `tail`, which is why a never-edited
//! identifier comes back as itself plus the net edits in front of it.

use std::collections::HashSet;

use super::errors::{IdMapError, IdMapResult};

/// Where the identifiers of a run come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Identifiers of the document as it was first loaded
    Initial,
    /// Identifiers registered through [`IdMap::insert`]
    Inserted,
}

/// A run of consecutive positions with consecutive identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub origin: Origin,
    pub first_id: u64,
    pub len: u64,
}

impl Anchor {
    fn contains(&self, id: u64) -> bool {
        id >= self.first_id && id - self.first_id < self.len
    }

    /// Whether `next` continues this run without a gap.
    fn joins(&self, next: &Anchor) -> bool {
        self.origin == next.origin && self.first_id.checked_add(self.len) == Some(next.first_id)
    }

    /// Offset to add to an identifier of this run when the run starts at
    /// `position`.
    pub fn addend(&self, position: u64) -> i128 {
        position as i128 - self.first_id as i128
    }
}

/// Stable identifier → document-order position translator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdMap {
    anchors: Vec<Anchor>,
    /// First identifier of the implicit identity tail, if unbounded
    tail: Option<u64>,
    /// Inserted identifiers whose nodes have been deleted
    retired: HashSet<u64>,
}

impl Default for IdMap {
    fn default() -> Self {
        Self::new()
    }
}

impl IdMap {
    /// Map over a document of unknown length where every identifier
    /// starts out equal to its position.
    pub fn new() -> Self {
        Self {
            anchors: Vec::new(),
            tail: Some(0),
            retired: HashSet::new(),
        }
    }

    /// Map over a document of exactly `size` nodes with identifiers
    /// `0..size`.
    pub fn with_size(size: u64) -> Self {
        let anchors = if size > 0 {
            vec![Anchor {
                origin: Origin::Initial,
                first_id: 0,
                len: size,
            }]
        } else {
            Vec::new()
        };
        Self {
            anchors,
            tail: None,
            retired: HashSet::new(),
        }
    }

    /// Current document length, `None` for unbounded maps.
    pub fn len(&self) -> Option<u64> {
        match self.tail {
            Some(_) => None,
            None => Some(self.covered()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    pub fn anchor_count(&self) -> usize {
        self.anchors.len()
    }

    /// Anchors with the position each one starts at.
    pub fn anchors(&self) -> impl Iterator<Item = (u64, &Anchor)> + '_ {
        self.anchors.iter().scan(0u64, |start, anchor| {
            let position = *start;
            *start = start.saturating_add(anchor.len);
            Some((position, anchor))
        })
    }

    /// Positions covered by explicit anchors.
    fn covered(&self) -> u64 {
        self.anchors
            .iter()
            .fold(0u64, |total, a| total.saturating_add(a.len))
    }

    /// Makes sure an anchor boundary sits at `position` and returns the
    /// index of the anchor that starts there (`anchors.len()` if none).
    fn split_at(&mut self, position: u64) -> IdMapResult<usize> {
        let mut start = 0u64;
        for index in 0..self.anchors.len() {
            let anchor = self.anchors[index];
            if position == start {
                return Ok(index);
            }
            if position - start < anchor.len {
                let head = position - start;
                self.anchors[index].len = head;
                self.anchors.insert(
                    index + 1,
                    Anchor {
                        origin: anchor.origin,
                        first_id: anchor.first_id + head,
                        len: anchor.len - head,
                    },
                );
                return Ok(index + 1);
            }
            start = start.saturating_add(anchor.len);
        }

        match self.tail {
            Some(tail) => {
                // materialise the untouched stretch up to `position`
                let gap = position - start;
                if gap > 0 {
                    let next_tail = tail.checked_add(gap).ok_or(IdMapError::PositionOutOfRange {
                        position,
                        len: u64::MAX,
                    })?;
                    self.anchors.push(Anchor {
                        origin: Origin::Initial,
                        first_id: tail,
                        len: gap,
                    });
                    self.tail = Some(next_tail);
                }
                Ok(self.anchors.len())
            }
            None if position == start => Ok(self.anchors.len()),
            None => Err(IdMapError::PositionOutOfRange {
                position,
                len: start,
            }),
        }
    }

    fn try_join(&mut self, index: usize) {
        if index + 1 < self.anchors.len() && self.anchors[index].joins(&self.anchors[index + 1]) {
            self.anchors[index].len += self.anchors[index + 1].len;
            self.anchors.remove(index + 1);
        }
    }

    /// Folds anchors around `index` that became contiguous again.
    fn fold_around(&mut self, index: usize) {
        self.try_join(index);
        if index > 0 {
            self.try_join(index - 1);
        }
        if let (Some(tail), Some(last)) = (self.tail, self.anchors.last()) {
            if last.origin == Origin::Initial && last.first_id + last.len == tail {
                self.tail = Some(last.first_id);
                self.anchors.pop();
            }
        }
    }

    /// Records that a new node with identifier `id` now sits at `position`;
    /// nodes at `position` and after move back by one.
    pub fn insert(&mut self, id: u64, position: u64) -> IdMapResult<()> {
        let index = self.split_at(position)?;
        if self.covered() == u64::MAX {
            // one more node would make positions past the end unaddressable
            return Err(IdMapError::PositionOutOfRange {
                position,
                len: u64::MAX,
            });
        }
        self.retired.remove(&id);

        if index > 0 {
            let prev = &mut self.anchors[index - 1];
            if prev.origin == Origin::Inserted && prev.first_id.checked_add(prev.len) == Some(id) {
                prev.len += 1;
                self.fold_around(index - 1);
                return Ok(());
            }
        }
        if let Some(next) = self.anchors.get_mut(index) {
            if next.origin == Origin::Inserted && id.checked_add(1) == Some(next.first_id) {
                next.first_id = id;
                next.len += 1;
                self.fold_around(index);
                return Ok(());
            }
        }

        self.anchors.insert(
            index,
            Anchor {
                origin: Origin::Inserted,
                first_id: id,
                len: 1,
            },
        );
        self.fold_around(index);
        Ok(())
    }

    /// Records that the node at `position` was removed; later nodes move
    /// forward by one.
    pub fn delete(&mut self, position: u64) -> IdMapResult<()> {
        let index = self.split_at(position)?;

        if index == self.anchors.len() {
            return match self.tail {
                Some(tail) => {
                    self.tail = Some(tail.checked_add(1).ok_or(IdMapError::PositionOutOfRange {
                        position,
                        len: u64::MAX,
                    })?);
                    Ok(())
                }
                None => Err(IdMapError::PositionOutOfRange {
                    position,
                    len: self.covered(),
                }),
            };
        }

        let anchor = &mut self.anchors[index];
        if anchor.origin == Origin::Inserted {
            self.retired.insert(anchor.first_id);
        }
        anchor.first_id += 1;
        anchor.len -= 1;
        if anchor.len == 0 {
            self.anchors.remove(index);
            if index > 0 {
                self.fold_around(index - 1);
                return Ok(());
            }
        }
        self.fold_around(index);
        Ok(())
    }

    /// Current position of the node with identifier `id`.
    ///
    /// Identifiers registered by `insert` take precedence over the same
    /// number in the initial range.
    pub fn position_of(&self, id: u64) -> IdMapResult<u64> {
        let mut start = 0u64;
        let mut initial = None;
        for anchor in &self.anchors {
            if anchor.contains(id) {
                let position = start + (id - anchor.first_id);
                match anchor.origin {
                    Origin::Inserted => return Ok(position),
                    Origin::Initial if initial.is_none() => initial = Some(position),
                    Origin::Initial => {}
                }
            }
            start = start.saturating_add(anchor.len);
        }

        if self.retired.contains(&id) {
            return Err(IdMapError::IdentifierNotFound(id));
        }
        if let Some(position) = initial {
            return Ok(position);
        }
        match self.tail {
            Some(tail) if id >= tail => start
                .checked_add(id - tail)
                .ok_or(IdMapError::IdentifierNotFound(id)),
            _ => Err(IdMapError::IdentifierNotFound(id)),
        }
    }
}
