//!  Storage is organized through [entry_log::EntryStoreImpl].
//!  The basic idea is:
//!   - The whole log lives in one json file.
//!   - The file maps ISO dates to the entries recorded on that day.
//!   - Every operation reads the file fresh, mutations rewrite it in full.

pub mod entities;
pub mod entry_log;
