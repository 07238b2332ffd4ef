//! XML text codec and tree used by every part reader and generator

pub mod dom;
pub mod escape;

pub use dom::{XML_DECLARATION, XmlElement, XmlNode};
pub use escape::{escape_attr, escape_text, needs_space_preserve};
