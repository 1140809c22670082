//! Pool items, surrogates and the attribute catalog seam.

use bytes::Bytes;
use std::any::Any;
use std::fmt;

/// One stored attribute value.
///
/// The payload is kept raw; an [`AttributeCatalog`] may decode it later
/// into [`attribute`](Item::attribute).
pub struct Item {
    /// Attribute id in the reader's numbering
    pub which: u16,
    /// Attribute id as stored in the file
    pub file_which: u16,
    /// Item format version
    pub version: u16,
    /// Position among the items of the same which-id, 0 for defaults
    pub index: u16,
    /// Number of references the writer counted, 0 for defaults
    pub ref_count: u16,
    pub payload: Bytes,
    pub attribute: Option<Box<dyn Any>>,
}

impl Item {
    #[inline]
    pub fn payload_length(&self) -> usize {
        self.payload.len()
    }

    /// Whether a catalog already decoded the payload.
    #[inline]
    pub fn is_decoded(&self) -> bool {
        self.attribute.is_some()
    }

    /// Decoded attribute as a concrete type.
    pub fn attribute_as<T: Any>(&self) -> Option<&T> {
        self.attribute.as_deref()?.downcast_ref::<T>()
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("which", &self.which)
            .field("file_which", &self.file_which)
            .field("version", &self.version)
            .field("index", &self.index)
            .field("ref_count", &self.ref_count)
            .field("payload_length", &self.payload.len())
            .field("decoded", &self.attribute.is_some())
            .finish()
    }
}

/// Decoder of attribute payloads, one per document family.
pub trait AttributeCatalog {
    /// Decode the payload of an item with the given which-id and version.
    ///
    /// `None` leaves the item as a surrogate.
    fn decode(&self, which: u16, version: u16, payload: &[u8]) -> Option<Box<dyn Any>>;
}

/// Item reference read in place of an item.
#[derive(Debug)]
pub enum Surrogate<'a> {
    /// The item itself follows in the stream
    Direct,
    /// No item
    Null,
    /// The pool default of the which-id, if the pool has one
    Default(Option<&'a Item>),
    /// A stored item
    Item(&'a Item),
    /// Index of an item the pool does not have
    Unresolved(u16),
}

impl<'a> Surrogate<'a> {
    /// The referenced item, if any.
    pub fn item(&self) -> Option<&'a Item> {
        match *self {
            Surrogate::Default(item) => item,
            Surrogate::Item(item) => Some(item),
            _ => None,
        }
    }
}
