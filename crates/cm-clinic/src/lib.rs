//! cm-clinic - Schema changesets for the clinic appointment database
//!
//! Every changeset is written with the `ensure_*` steps of
//! [`cm_migrate::SchemaManager`], so each one can be re-run against a
//! database where it was partially applied, or where an operator already
//! made part of the change by hand.

pub mod changesets;
pub mod names;

use cm_migrate::{MigrateResult, Registry};

/// All clinic changesets, in order.
pub fn registry() -> MigrateResult<Registry> {
    let mut registry = Registry::new();
    for changeset in changesets::all() {
        registry.register_boxed(changeset)?;
    }
    Ok(registry)
}
