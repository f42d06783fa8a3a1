//! Observable events of the storefront data core
//!
//! Events are explicit and typed; each carries its own severity.

use std::fmt;

use super::logger::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Boot & Lifecycle
    /// Process startup begins
    BootStart,
    /// Startup complete, schema applied
    BootComplete,
    /// Startup aborted (FATAL)
    BootFailed,

    // Configuration
    /// Configuration loaded
    ConfigLoaded,

    // Store
    /// Document store opened
    StoreOpened,
    /// Torn journal tail discarded on open
    JournalTailDiscarded,
    /// Failed append could not be rolled back; journal refuses writes
    JournalPoisoned,

    // Schema
    /// Persisted schema version being checked
    SchemaCheck,
    /// Schema metadata and collection configs written
    SchemaApplied,
    /// Persisted schema already current
    SchemaCurrent,
    /// Schema initialization failed
    SchemaApplyFailed,

    // Validation
    /// Record rejected by the document validator
    ValidationRejected,

    // Identity
    /// Account created with the identity provider
    AccountCreated,
    /// Identity account removed after a failed profile write
    AccountRolledBack,
    /// User signed in
    SignedIn,
    /// User signed out
    SignedOut,

    // Catalog
    /// Product persisted
    ProductCreated,
    /// Product creation refused for a non-admin user
    ProductRefused,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::BootStart => "STOREFRONT_STARTUP_BEGIN",
            Event::BootComplete => "STOREFRONT_STARTUP_COMPLETE",
            Event::BootFailed => "STOREFRONT_STARTUP_FAILED",

            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::StoreOpened => "STORE_OPENED",
            Event::JournalTailDiscarded => "JOURNAL_TAIL_DISCARDED",
            Event::JournalPoisoned => "JOURNAL_POISONED",

            Event::SchemaCheck => "SCHEMA_CHECK_BEGIN",
            Event::SchemaApplied => "SCHEMA_APPLIED",
            Event::SchemaCurrent => "SCHEMA_CURRENT",
            Event::SchemaApplyFailed => "SCHEMA_APPLY_FAILED",

            Event::ValidationRejected => "VALIDATION_REJECTED",

            Event::AccountCreated => "ACCOUNT_CREATED",
            Event::AccountRolledBack => "ACCOUNT_ROLLED_BACK",
            Event::SignedIn => "SIGNED_IN",
            Event::SignedOut => "SIGNED_OUT",

            Event::ProductCreated => "PRODUCT_CREATED",
            Event::ProductRefused => "PRODUCT_REFUSED",
        }
    }

    /// Returns the severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::BootFailed => Severity::Fatal,
            Event::SchemaApplyFailed | Event::JournalPoisoned => Severity::Error,
            Event::JournalTailDiscarded
            | Event::ValidationRejected
            | Event::AccountRolledBack
            | Event::ProductRefused => Severity::Warn,
            _ => Severity::Info,
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
