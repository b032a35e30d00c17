mod analysis;
mod common;
mod history;
mod profile;
mod user;

pub use analysis::*;
pub use common::*;
pub use history::*;
pub use profile::*;
pub use user::*;
