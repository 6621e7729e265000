//! Conference program reader: the catalog provider behind the talk lookup stage.
//!
//! This crate provides:
//! - [`ProgramReader`]: fetches a program page (`http`, `https` or `file`)
//!   and turns it into an ordered list of talks
//! - [`adapters`]: layout-specific talk extractors (schema.org microdata, generic)
//! - [`LayoutRegistry`]: detects the best layout for a given HTML document

pub mod adapters;
pub mod reader;
mod time;

pub use adapters::{GenericLayout, LayoutRegistry, ProgramLayout, SchemaOrgLayout, TalkEntry};
pub use reader::ProgramReader;
pub use time::{parse_time_range, parse_timestamp};
