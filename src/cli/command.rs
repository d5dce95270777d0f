use clap::Subcommand;

use crate::cli::admin_cmd::AdminCmd;
use crate::cli::course_cmd::CourseCmd;
use crate::cli::user_cmd::UserCmd;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    #[command(
        about = "User account commands",
        long_about = "Create login accounts and attach instructor or learner profiles to them."
    )]
    User {
        #[command(subcommand)]
        cmd: UserCmd,
    },
    #[command(
        about = "Course content commands",
        long_about = "Author courses together with their lessons, exam questions and answer choices."
    )]
    Course {
        #[command(subcommand)]
        cmd: CourseCmd,
    },
    #[command(
        about = "Admin registry commands",
        long_about = "Inspect how each record type is presented to staff: columns, filters and inline children."
    )]
    Admin {
        #[command(subcommand)]
        cmd: AdminCmd,
    },
}
