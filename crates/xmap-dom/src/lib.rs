//! XML tree for xmap.
//!
//! An arena [`Document`] of elements, text, CDATA and comments with parent
//! links, so values can be placed and found relative to any anchor element.
//!
//! - [`Document::parse`] reads namespace-aware XML through `quick-xml`
//! - [`Document::write_xml`] writes it back, declaring prefixes as needed
//! - [`LocationPath`] resolves and creates relative element paths
//!
//! # Example
//!
//! ```
//! use xmap_dom::{Document, LocationPath, WriteOptions};
//!
//! let (mut doc, root) = Document::with_root("Config");
//! let node = doc.create_location(root, &LocationPath::parse("Window/Size"), None)?;
//! doc.append_text(node, "800");
//!
//! let xml = doc.to_xml_string(&WriteOptions::compact())?;
//! assert_eq!(xml, "<Config><Window><Size>800</Size></Window></Config>");
//! # Ok::<(), xmap_dom::Error>(())
//! ```

mod document;
mod error;
mod location;
mod name;
mod parser;
mod writer;

pub use document::{Attribute, Checkpoint, Document, Element, NamespaceDecl, NodeId, NodeKind};
pub use error::{Error, Result};
pub use location::{LocationPath, Step};
pub use name::{sanitize_name, QName, XMLNS_NAMESPACE, XML_NAMESPACE};
pub use writer::WriteOptions;
