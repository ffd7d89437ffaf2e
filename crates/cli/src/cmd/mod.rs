mod cleanup;
mod extensions;
mod generate;
mod run;
mod teardown;
mod versions;

pub use cleanup::cmd_cleanup;
pub use extensions::cmd_extensions;
pub use generate::{GenerateArgs, cmd_generate};
pub use run::{RunArgs, cmd_run};
pub use teardown::cmd_teardown;
pub use versions::cmd_versions;
