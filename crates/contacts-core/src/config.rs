use crate::error::{ContactsError, Result};

/// Configuration for the merge and split engines
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Joins distinct values when two contacts' free-text fields are merged.
    /// Default: "; ".
    pub field_separator: String,

    /// Request re-indexing when a contact's searchable text changes.
    /// Default: true.
    pub reindex_on_change: bool,

    /// Delete the merged contact once a full split has emptied it.
    /// Default: true.
    pub delete_emptied_contact: bool,

    /// Name of the single writer thread. Default: "contacts-owner".
    pub owner_thread_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            field_separator: "; ".into(),
            reindex_on_change: true,
            delete_emptied_contact: true,
            owner_thread_name: "contacts-owner".into(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field_separator(mut self, separator: impl Into<String>) -> Self {
        self.field_separator = separator.into();
        self
    }

    pub fn with_reindex(mut self, enabled: bool) -> Self {
        self.reindex_on_change = enabled;
        self
    }

    pub fn with_delete_emptied_contact(mut self, enabled: bool) -> Self {
        self.delete_emptied_contact = enabled;
        self
    }

    pub fn with_owner_thread_name(mut self, name: impl Into<String>) -> Self {
        self.owner_thread_name = name.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        // Merged values are split on ';' to detect duplicates
        if self.field_separator.trim() != ";" {
            return Err(ContactsError::Validation(format!(
                "field_separator must be ';' with optional padding, got {:?}",
                self.field_separator
            )));
        }

        if self.owner_thread_name.trim().is_empty() {
            return Err(ContactsError::Validation(
                "owner_thread_name must not be empty".into(),
            ));
        }

        Ok(())
    }
}
