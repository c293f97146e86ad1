//! Utility modules supporting the citation registry.
//!
//! - [`extract`]: best-effort field extraction from raw entry text
//! - [`format_citation`]: render a record as a line, APA-like prose or BibTeX
//! - [`find_duplicate_groups`]: find records citing the same work
//! - [`elements`]: element table used to index topics by element
//! - [`truncate_with_ellipsis`] and friends: terminal table helpers
//!
//! # Formatting
//!
//! ```rust
//! use citation_registry::models::CitationRecord;
//! use citation_registry::utils::{format_citation, CitationStyle};
//!
//! let record = CitationRecord::from_raw("Castor, S.B., 2008, Mountain Pass: Canadian Mineralogist.", 1);
//! assert_eq!(
//!     format_citation(&record, CitationStyle::Line),
//!     "Castor, S.B. | 2008 | Mountain Pass | "
//! );
//! ```

mod cite;
mod dedup;
mod display;
pub mod elements;
pub mod extract;

pub use cite::{citation_key, format_citation, CitationStyle};
pub use dedup::{find_duplicate_groups, DEFAULT_TITLE_THRESHOLD};
pub use display::{
    calculate_column_widths, citation_table_columns, is_terminal, terminal_width,
    truncate_at_word, truncate_with_ellipsis, ColumnConfig,
};
pub use elements::Element;
