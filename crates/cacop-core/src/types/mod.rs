mod certificate;
mod chain;
mod report;
mod status;

pub use certificate::*;
pub use chain::*;
pub use report::*;
pub use status::*;
