pub mod dataset;
pub mod resolve;
pub mod store;
pub mod util;

pub use dataset::*;
pub use resolve::*;
pub use store::*;
pub use util::*;
