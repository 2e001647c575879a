//! Index types for mesh and graph elements.
//!
//! Type-safe wrappers around `u32` keep mesh vertices, mesh triangles and
//! triangle-graph nodes from being mixed up. A triangle and the graph node
//! built from it share the same raw index.

use std::fmt::{self, Debug};

/// Sentinel raw value for an invalid/null index.
const INVALID: u32 = u32::MAX;

/// A type-safe mesh vertex index.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct VertexId(u32);

/// A type-safe triangle (face) index.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct FaceId(u32);

/// A type-safe triangle-graph node index.
///
/// Node `i` of a [`TriangleGraph`](crate::graph::TriangleGraph) represents
/// triangle `i` of the mesh it was built from.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct NodeId(u32);

macro_rules! impl_index_type {
    ($name:ident, $display:literal) => {
        impl $name {
            /// Create a new index from a raw value.
            #[inline]
            pub fn new(index: usize) -> Self {
                debug_assert!(index < INVALID as usize, "index {} too large", index);
                Self(index as u32)
            }

            /// Create an invalid/null index.
            #[inline]
            pub fn invalid() -> Self {
                Self(INVALID)
            }

            /// Get the raw index value.
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            /// Check if this is a valid (non-null) index.
            #[inline]
            pub fn is_valid(self) -> bool {
                self.0 != INVALID
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, "{}({})", $display, self.index())
                } else {
                    write!(f, "{}(INVALID)", $display)
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::invalid()
            }
        }

        impl From<usize> for $name {
            fn from(v: usize) -> Self {
                Self::new(v)
            }
        }
    };
}

impl_index_type!(VertexId, "V");
impl_index_type!(FaceId, "F");
impl_index_type!(NodeId, "N");

impl From<FaceId> for NodeId {
    fn from(f: FaceId) -> Self {
        NodeId(f.0)
    }
}

impl From<NodeId> for FaceId {
    fn from(n: NodeId) -> Self {
        FaceId(n.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_id() {
        let v = VertexId::new(42);
        assert_eq!(v.index(), 42);
        assert!(v.is_valid());

        let invalid = VertexId::invalid();
        assert!(!invalid.is_valid());
    }

    #[test]
    fn test_face_node_correspondence() {
        let f = FaceId::new(7);
        let n: NodeId = f.into();
        assert_eq!(n.index(), 7);
        assert_eq!(FaceId::from(n), f);
    }

    #[test]
    fn test_debug_format() {
        assert_eq!(format!("{:?}", VertexId::new(42)), "V(42)");
        assert_eq!(format!("{:?}", NodeId::new(3)), "N(3)");
        assert_eq!(format!("{:?}", FaceId::invalid()), "F(INVALID)");
    }
}
