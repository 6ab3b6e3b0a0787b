/// Router Module Index
///
/// Splits the page routes by who may reach them. Both routers sit behind the
/// access gate; the split documents which paths are on its allow-list.

/// Allow-listed routes: the entry point and the account flows.
pub mod public;

/// Routes that only run with a resolved session.
pub mod authenticated;
