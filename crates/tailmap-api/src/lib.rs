//! External-source plumbing for the tailmap workspace.
//!
//! Two ways device records enter the system from outside:
//!
//! - **[`DirectoryClient`]** — async HTTP client for the tailnet
//!   directory API. Bearer-auth device roster fetch with a one-shot
//!   retry for key scopes that reject the fully-qualified tailnet name.
//! - **[`ManualDocument`]** — the curated JSON device file, loadable
//!   and savable (export target for the round trip back into the file
//!   source).
//!
//! Everything here is transport and shape only; normalization into
//! domain types lives in `tailmap-core`.

pub mod directory;
pub mod error;
pub mod manual;

pub use directory::{DirectoryClient, DirectoryDevice};
pub use error::Error;
pub use manual::{ManualDevice, ManualDocument};
