/// Error code registry for the migration engine.
///
/// Ranges:
/// - 1000-1999: Configuration / credential errors
/// - 2000-2999: Queue / dispatcher errors
/// - 3000-3999: Telemetry store errors
/// - 4000-4999: Executor errors
/// - 5000-5999: Group-chat / agent errors
/// - 6000-6999: Phase / process errors
/// - 7000-7999: Validation errors
/// - 9000-9999: Other errors
#[allow(dead_code)]
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_GENERIC: u16 = 1000;
    pub const CONFIG_MISSING_REQUIRED: u16 = 1001;
    pub const CONFIG_INVALID_VALUE: u16 = 1002;
    pub const CONFIG_REMOTE_UNAVAILABLE: u16 = 1003;
    pub const CONFIG_CREDENTIAL_UNAVAILABLE: u16 = 1004;

    // Queue / dispatcher errors (2000-2999)
    pub const QUEUE_GENERIC: u16 = 2000;
    pub const QUEUE_LEASE_FAILED: u16 = 2001;
    pub const QUEUE_MESSAGE_MALFORMED: u16 = 2002;
    pub const QUEUE_DEAD_LETTERED: u16 = 2003;
    pub const QUEUE_SHUTDOWN_TIMEOUT: u16 = 2004;

    // Telemetry store errors (3000-3999)
    pub const STORAGE_GENERIC: u16 = 3000;
    pub const STORAGE_NOT_FOUND: u16 = 3001;
    pub const STORAGE_ALREADY_EXISTS: u16 = 3002;
    pub const STORAGE_CONFLICT: u16 = 3003;
    pub const STORAGE_LOCK_FAILED: u16 = 3004;
    pub const STORAGE_BACKEND_ERROR: u16 = 3005;
    pub const STORAGE_PHASE_REGRESSION: u16 = 3006;

    // Executor errors (4000-4999)
    pub const EXEC_GENERIC: u16 = 4000;
    pub const EXEC_TIMEOUT: u16 = 4001;
    pub const EXEC_TASK_FAILED: u16 = 4002;
    pub const EXEC_CANCELLED: u16 = 4003;

    // Group-chat / agent errors (5000-5999)
    pub const GROUPCHAT_GENERIC: u16 = 5000;
    pub const GROUPCHAT_TURN_CAP_EXCEEDED: u16 = 5001;
    pub const GROUPCHAT_MESSAGE_CAP_EXCEEDED: u16 = 5002;
    pub const GROUPCHAT_SELECTION_FAILED: u16 = 5003;
    pub const GROUPCHAT_CANCELLED: u16 = 5004;

    // Phase / process errors (6000-6999)
    pub const PHASE_GENERIC: u16 = 6000;
    pub const PHASE_BLOCKED: u16 = 6001;
    pub const PHASE_RETRY_EXHAUSTED: u16 = 6002;
    pub const PROCESS_ALREADY_FINALIZED: u16 = 6003;
    pub const PROCESS_PHASE_OUT_OF_ORDER: u16 = 6004;

    // Validation errors (7000-7999)
    pub const VALIDATION_GENERIC: u16 = 7000;
    pub const VALIDATION_OUT_OF_RANGE: u16 = 7001;
    pub const VALIDATION_REQUIRED_FIELD: u16 = 7002;

    // Other errors (9000-9999)
    pub const OTHER_GENERIC: u16 = 9000;
    pub const OTHER_INTERNAL: u16 = 9001;
}

/// Human-readable description for an error code, used in developer-facing output.
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        1000 => "Generic configuration error",
        1001 => "Required configuration value is missing",
        1002 => "Invalid configuration value",
        1003 => "Remote configuration store unavailable",
        1004 => "No usable credential could be constructed",

        2000 => "Generic queue error",
        2001 => "Failed to lease a queue message",
        2002 => "Queue message payload is malformed",
        2003 => "Message moved to the dead-letter queue",
        2004 => "Graceful shutdown exceeded its wait budget",

        3000 => "Generic telemetry store error",
        3001 => "Telemetry record not found",
        3002 => "Telemetry record already exists",
        3003 => "Concurrent telemetry write conflict",
        3004 => "Failed to acquire per-process telemetry lock",
        3005 => "Telemetry backend error",
        3006 => "Phase transition would regress process state",

        4000 => "Generic executor error",
        4001 => "Task exceeded its timeout",
        4002 => "Task failed after exhausting retries",
        4003 => "Task cancelled by a sibling failure",

        5000 => "Generic group-chat error",
        5001 => "Group chat exceeded its turn cap",
        5002 => "Group chat exceeded its message cap",
        5003 => "Agent selection could not be resolved",
        5004 => "Group chat cancelled",

        6000 => "Generic phase error",
        6001 => "Phase blocked by a hard termination",
        6002 => "Phase retry budget exhausted",
        6003 => "Process already finalized",
        6004 => "Phase requested out of sequence",

        7000 => "Generic validation error",
        7001 => "Value out of allowed range",
        7002 => "Required field is missing",

        9000 => "Generic error",
        9001 => "Internal error",

        _ => "Unknown error code",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_ranges_are_disjoint() {
        assert!((1000..2000).contains(&ErrorCode::CONFIG_GENERIC));
        assert!((2000..3000).contains(&ErrorCode::QUEUE_GENERIC));
        assert!((3000..4000).contains(&ErrorCode::STORAGE_GENERIC));
        assert!((4000..5000).contains(&ErrorCode::EXEC_GENERIC));
        assert!((5000..6000).contains(&ErrorCode::GROUPCHAT_GENERIC));
        assert!((6000..7000).contains(&ErrorCode::PHASE_GENERIC));
        assert!((7000..8000).contains(&ErrorCode::VALIDATION_GENERIC));
        assert!((9000..10000).contains(&ErrorCode::OTHER_GENERIC));
    }

    #[test]
    fn unknown_code_has_fallback_description() {
        assert_eq!(describe_error_code(42), "Unknown error code");
        assert_eq!(describe_error_code(2003), "Message moved to the dead-letter queue");
    }
}
