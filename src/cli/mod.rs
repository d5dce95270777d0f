mod admin_cmd;
mod args;
mod command;
mod course_cmd;
mod user_cmd;

pub use admin_cmd::AdminCmd;
pub use args::Cli;
pub use command::Command;
pub use course_cmd::CourseCmd;
pub use user_cmd::UserCmd;

pub use args::parse;
