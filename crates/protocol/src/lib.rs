//! # flatref protocol
//!
//! The reference-line text format shared by the dump and download paths:
//!
//! ```text
//! app/<id>/<arch>/<branch>
//! ```
//!
//! `.refs` files hold one reference per line; blank lines and `#` comments are
//! ignored and line order carries no meaning.
//!
//! ```
//! use flatref_protocol::{parse_line, parse_str};
//!
//! assert_eq!(
//!     parse_line("app/org.example.App/x86_64/stable").as_deref(),
//!     Some("org.example.App")
//! );
//! assert_eq!(parse_str("app/org.example.App/x86_64/stable\n# note\n").len(), 1);
//! ```

mod error;
mod refline;
mod reflist;

pub use error::{RefListError, Result};
pub use refline::{is_dotted_app_id, make_ref, parse_line, RefLine, APP_REF_KIND};
pub use reflist::{collect_app_ids, find_refs_in_dir, parse_file, parse_str, REFS_EXTENSION};
