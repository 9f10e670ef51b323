use thiserror::Error;

/// Errors raised by the aggregation operations.
///
/// Degraded observations are not errors: a component with an incomplete
/// position, an empty component overlap between two items, or a zero
/// elapsed time are all recovered locally with `None` values or the
/// unmatchable sentinel. Only an item representation the engine cannot
/// aggregate at all surfaces here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackError {
    /// The requested operation is only defined for component-built items.
    #[error("unsupported representation for {0}: only component-built items can be aggregated")]
    UnsupportedRepresentation(String),
}
