pub mod store {
    pub const NOT_FOUND: &str = "RX404";
    pub const CONFLICT: &str = "RX409";
    pub const CORRUPT: &str = "RX800";
    pub const BACKEND_FAILURE: &str = "RX810";
    pub const FORMAT_INCOMPATIBLE: &str = "RX812";
}

pub mod action {
    pub const NOT_FOUND: &str = "RX404";
    pub const INVALID_OPERATION: &str = "RX422";
    pub const SCHEMA_VIOLATION: &str = "RX500";
}

pub mod wire {
    pub const MALFORMED: &str = "RX400";
}

pub mod adapter {
    pub const UNSUPPORTED: &str = "RX415";
}
