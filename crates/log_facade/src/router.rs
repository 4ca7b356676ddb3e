//! Severity-based routing of records to destinations.

use crate::Level;

/// The destinations a logger fans records out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// The main rolling log file.
    MainFile,

    /// The rolling log file receiving only error-level records and above.
    ErrorFile,

    /// The standard output stream.
    Stdout,

    /// The standard error stream.
    Stderr,
}

impl Destination {
    /// All destinations, in the order records are written to them.
    pub const ALL: [Self; 4] = [Self::MainFile, Self::ErrorFile, Self::Stdout, Self::Stderr];
}

/// Decides whether a destination accepts a record, given the configured minimum level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    minimum: Level,
    destination: Destination,
}

impl Route {
    /// Creates the route for a destination.
    pub fn new(destination: Destination, minimum: Level) -> Self {
        Self {
            minimum,
            destination,
        }
    }

    /// The destination this route leads to.
    pub fn destination(&self) -> Destination {
        self.destination
    }

    /// Whether a record at `level` is written to the destination.
    pub fn accepts(&self, level: Level) -> bool {
        if level < self.minimum {
            return false;
        }

        match self.destination {
            Destination::MainFile => true,
            Destination::ErrorFile | Destination::Stderr => level.is_error_or_above(),
            Destination::Stdout => !level.is_error_or_above(),
        }
    }
}
