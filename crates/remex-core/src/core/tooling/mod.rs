pub mod diagnostics;
pub mod outcome;
