//! Fetched page handling
//!
//! A [`PageView`] wraps one HTTP response and lazily derives its text, HTML and
//! XML trees, redirect target, meta directives and classified outbound links.

mod links;
mod view;
mod xml;

pub use links::LinkSet;
pub use view::PageView;
pub use xml::XmlNode;
