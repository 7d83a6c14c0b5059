//! One module per subcommand.

mod add;
mod completions;
mod pause;
mod remove;
mod resume;
mod status;
mod stop;
mod transfers;

pub use add::run_add;
pub use completions::run_completions;
pub use pause::run_pause;
pub use remove::run_remove;
pub use resume::run_resume;
pub use status::run_status;
pub use stop::run_stop;
pub use transfers::run_transfers;
