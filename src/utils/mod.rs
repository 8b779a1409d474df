//! utils is a tool module that provides id generation, disposer constructors
//! and the optional lifecycle status report.
pub mod convenience;
pub mod status_report;

pub use convenience::functions;
