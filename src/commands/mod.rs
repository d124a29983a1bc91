//! Entry points for the UI.
//!
//! Each function is one user action. Validation failures come back as an
//! `ApiResult` with `success: false`; the outer `Err` is reserved for
//! failures the UI can't do anything about.

pub mod files;
pub mod folders;
pub mod panes;
pub mod settings;
pub mod storage;
pub mod transfer;

pub use files::*;
pub use folders::*;
pub use panes::*;
pub use settings::*;
pub use storage::*;
pub use transfer::*;
