use num_enum::{IntoPrimitive, TryFromPrimitive};
use thiserror::Error;

pub type CResult<T> = Result<T, QueryError>;

/// Error taxonomy for the compile/plan/dispatch path (spec.md §7).
///
/// Every compiler error, coverage error and sub-query storage error is
/// surfaced to the client as-is; `Mismanagement` is the one fatal,
/// "this is a bug" case (§4.5, `execute` called while `status != void`).
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    #[error("query is already compiled")]
    AlreadyCompiled,
    #[error("full table scans are not supported")]
    FullTableScanUnsupported,
    #[error("no lower time bound on the quantum field")]
    NoLowerBound,
    #[error("no upper time bound on the quantum field")]
    NoUpperBound,
    #[error("duplicate lower bound on the quantum field")]
    DuplicateLowerBound,
    #[error("duplicate upper bound on the quantum field")]
    DuplicateUpperBound,
    #[error("lower bound is greater than upper bound")]
    LowerBoundGtUpper,
    #[error("lower bound equals upper bound under a strict operator")]
    DegenerateRange,
    #[error("time bounds on the quantum field must be combined with AND")]
    TimeBoundsMustUseAnd,
    #[error("missing equality binding for key field `{0}`")]
    MissingKeyField(String),
    #[error("key field `{field}` must be bound with `=`, found `{op}`")]
    KeyFieldMustUseEquals { field: String, op: String },
    #[error("query expands into {0} sub-queries, exceeding the configured span")]
    TooManySubqueries(usize),
    #[error("no primary owner available for the sub-query's key range")]
    NoPrimariesAvailable,
    #[error("sub-query timed out waiting on storage")]
    SubQueryTimeout,
    #[error("storage backend returned an error: {0}")]
    BackendTimeout(String),
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("table `{0}` is not active")]
    TableInactive(String),
    #[error("missing time-series helper module for table `{0}`")]
    MissingHelperModule(String),
    #[error("table `{0}` not found")]
    NotFound(String),
    #[error("failed to parse statement: {0}")]
    ParseError(String),
    /// Invariant violated internally — logged as a bug, not retried.
    #[error("internal invariant violated: {0}")]
    Mismanagement(String),
}

/// Wire-stable error codes, preserved from the surface protocol (spec.md §6).
/// Other system layers (create/activate/put/get/delete) mint the codes this
/// core doesn't use; they are kept here only so the closed set stays in one
/// place.
#[derive(IntoPrimitive, TryFromPrimitive, Debug, Copy, Clone, Eq, PartialEq)]
#[repr(i32)]
pub enum WireErrorCode {
    Submit = 1001,
    Fetch = 1002,
    IrregularData = 1003,
    Put = 1004,
    NotTsType = 1006,
    MissingType = 1007,
    MissingTsHelperModule = 1008,
    Delete = 1009,
    Get = 1010,
    BadKeyLength = 1011,
    ListKeys = 1012,
    Timeout = 1013,
    Create = 1014,
    Activate = 1017,
    BadQuery = 1018,
    TableInactive = 1019,
    ParseError = 1020,
    NotFound = 1021,
}

impl QueryError {
    /// Maps a core error onto the closed wire code set it can actually produce.
    pub fn wire_code(&self) -> WireErrorCode {
        match self {
            QueryError::TableInactive(_) => WireErrorCode::TableInactive,
            QueryError::MissingHelperModule(_) => WireErrorCode::MissingTsHelperModule,
            QueryError::NotFound(_) => WireErrorCode::NotFound,
            QueryError::ParseError(_) => WireErrorCode::ParseError,
            QueryError::SubQueryTimeout | QueryError::BackendTimeout(_) => WireErrorCode::Timeout,
            _ => WireErrorCode::BadQuery,
        }
    }
}
