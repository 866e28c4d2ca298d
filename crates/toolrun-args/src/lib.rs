//! Declarative command-line arguments for external executables
//!
//! An [`Invocation`] owns a base command and an ordered list of typed
//! [`Argument`]s. Callers declare arguments with [`ArgumentSpec`] and keep the
//! returned [`ArgHandle`] to read and write values later:
//!
//! ```rust
//! use toolrun_args::{ArgumentSpec, Invocation};
//!
//! let mut inv = Invocation::new("delta run");
//! let area = inv.add(
//!     ArgumentSpec::int("Min cell area")
//!         .token("-C")
//!         .default_value(0)
//!         .key("MIN_CELL_AREA")
//!         .translator(|v: &i64| vec![format!("min_cell_area={v}")]),
//! );
//! let input = inv.add(ArgumentSpec::string("Input file").token("--input").required(true));
//!
//! assert!(inv.check().is_some());
//! inv.set(input, "/tmp/img-t{t}.tif").unwrap();
//! inv.set(area, 20).unwrap();
//!
//! assert_eq!(
//!     inv.build().unwrap(),
//!     vec!["delta", "run", "min_cell_area=20", "--input", "/tmp/img-t{t}.tif"]
//! );
//! ```
//!
//! # Security Model
//!
//! Tokens are produced as discrete strings and are never joined into a shell
//! command line. Whatever a translator returns is passed to the process as-is.

pub mod argument;
pub mod error;
pub mod invocation;
pub mod settings;
pub mod value;

pub use argument::{Argument, ArgumentSpec, Tokenization, Translator};
pub use error::{ArgumentError, ValidationError};
pub use invocation::{ArgHandle, Invocation};
pub use value::{ArgKind, ArgType, ArgValue};
