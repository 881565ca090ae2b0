pub(crate) mod questions;
pub(crate) mod results;
pub(crate) mod runs;
pub(crate) mod schema;
