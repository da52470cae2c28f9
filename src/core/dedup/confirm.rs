//! Deciding whether a duplicate may be deleted.

use std::path::Path;

/// Asked once per duplicate before it is deleted
pub trait DeleteConfirmation {
    /// `true` deletes `duplicate`; `original` is the copy that stays.
    fn confirm_delete(&mut self, duplicate: &Path, original: &Path) -> bool;
}

/// Approves every deletion
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

impl DeleteConfirmation for AutoConfirm {
    fn confirm_delete(&mut self, _duplicate: &Path, _original: &Path) -> bool {
        true
    }
}

/// Declines every deletion
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverConfirm;

impl DeleteConfirmation for NeverConfirm {
    fn confirm_delete(&mut self, _duplicate: &Path, _original: &Path) -> bool {
        false
    }
}

impl<F> DeleteConfirmation for F
where
    F: FnMut(&Path, &Path) -> bool,
{
    fn confirm_delete(&mut self, duplicate: &Path, original: &Path) -> bool {
        self(duplicate, original)
    }
}
