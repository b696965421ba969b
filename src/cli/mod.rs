mod command;
mod runner;
mod util;

pub use command::Command;
pub use runner::{OutputMode, Session, run_with_format};
pub use util::{compiled_features, fake_course, json_arg};
