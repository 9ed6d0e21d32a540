//! Identity map: stable node identifier → current document position
//!
//! Driven once per structural edit, in the same order the edits are applied
//! to the tree. Holds only integers; cost per operation is linear in the
//! number of anchors, which grows with the number of distinct edit
//! boundaries rather than with document size.
//!
//! ```ignore
//! let mut map = IdMap::new();
//! map.insert(5, 2)?;          // new node 5 at position 2
//! map.insert(9, 2)?;          // new node 9 pushes node 5 to 3
//! assert_eq!(map.position_of(5)?, 3);
//! map.delete(2)?;             // node 9 removed
//! ```

mod errors;
mod map;

pub use errors::{IdMapError, IdMapResult};
pub use map::{Anchor, IdMap, Origin};
