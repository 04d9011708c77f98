//! Job-scoped tag handling
//!
//! A tag used to stage job input is an ephemeral handle, not a persistent
//! name: data left over from an earlier run is destroyed before new data is
//! attached, and the tag is destroyed again once the job is done with it.
//! There is no locking; concurrent runs must use distinct tags.

use crate::error::StoreError;
use crate::store::ChunkStore;
use crate::tag::Tag;

/// Exclusive, scoped use of a tag.
///
/// Deletes the tag on [`release`](Self::release) or, failing that, on drop,
/// so every exit path (including errors and panics) cleans up.
pub struct NamespaceGuard<'a> {
    store: &'a dyn ChunkStore,
    tag: Tag,
    armed: bool,
}

impl<'a> NamespaceGuard<'a> {
    /// Take over `tag`, destroying whatever a previous run left under it.
    ///
    /// Post-condition: `store.exists(tag)` is false.
    pub fn acquire(store: &'a dyn ChunkStore, tag: Tag) -> Result<Self, StoreError> {
        if store.exists(&tag)? {
            log::warn!("Overwriting tag {tag}: deleting existing data");
            store.delete(&tag)?;
        }
        Ok(Self {
            store,
            tag,
            armed: true,
        })
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    /// Delete the tag now and report the outcome.
    pub fn release(mut self) -> Result<(), StoreError> {
        self.armed = false;
        self.store.delete(&self.tag)?;
        log::debug!("Released tag {}", self.tag);
        Ok(())
    }

    /// Keep the tag's data beyond this guard (ingestion output meant for a
    /// later job). The next `acquire` of the same tag will still wipe it.
    pub fn persist(mut self) -> Tag {
        self.armed = false;
        self.tag.clone()
    }
}

impl Drop for NamespaceGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match self.store.delete(&self.tag) {
            Ok(()) => log::debug!("Released tag {} on early exit", self.tag),
            Err(e) => log::error!("Failed to delete tag {}: {e}", self.tag),
        }
    }
}

/// Run `f` with `tag` acquired, releasing it afterwards whatever `f` returns.
///
/// An error from `f` takes precedence over a release error.
pub fn with_tag<T, E>(
    store: &dyn ChunkStore,
    tag: Tag,
    f: impl FnOnce(&Tag) -> Result<T, E>,
) -> Result<T, E>
where
    E: From<StoreError>,
{
    let guard = NamespaceGuard::acquire(store, tag)?;
    let result = f(guard.tag());
    match result {
        Ok(value) => {
            guard.release()?;
            Ok(value)
        }
        Err(e) => {
            if let Err(release_err) = guard.release() {
                log::error!("Failed to release tag after job error: {release_err}");
            }
            Err(e)
        }
    }
}
