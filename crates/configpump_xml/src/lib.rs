//! # ConfigPump XML
//!
//! Pure XML tooling for configuration synchronization.
//!
//! This crate provides:
//! - Canonical normalization (blank text stripped, empty elements
//!   self-closed, two-space pretty printing)
//! - Line diff counters between two documents
//! - An XPath subset evaluator
//! - Subtree extraction that keeps matched elements and their ancestors
//! - Scope deduction for Panorama templates and device groups
//!
//! ## Usage
//!
//! ```
//! use configpump_xml::{diff, extract, normalize};
//!
//! let (text, valid) = normalize("<config><a></a></config>");
//! assert!(valid);
//! assert_eq!(text, "<config>\n  <a/>\n</config>\n");
//!
//! let counts = diff("<config><a/></config>", "<config><a/><b/></config>", false);
//! assert_eq!(counts.added, 1);
//!
//! let shared = extract("<config><shared/><mgt/></config>", &["/config/shared"]).unwrap();
//! assert_eq!(shared, "<config>\n  <shared/>\n</config>\n");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod diff;
mod dom;
mod error;
mod extract;
mod normalize;
mod scope;
mod xpath;

pub use diff::{diff, split_lines, DiffResult, Match, OpTag, Opcode, SequenceMatcher};
pub use dom::{Document, Element, NodeId, NodeKind};
pub use error::{XmlError, XmlResult};
pub use extract::extract;
pub use normalize::{is_valid, normalize};
pub use scope::{deduce_xpath_entries, list_item_names, PANORAMA_DEVICE, SCOPED_ITEM_TYPES};
pub use xpath::{Item, XPath};
