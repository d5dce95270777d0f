use clap::Subcommand;

#[derive(Subcommand, Debug, Clone)]
pub enum UserCmd {
    #[command(
        about = "Create a login account",
        long_about = "Create a user account. Without --password the password is prompted for when stdin is a terminal."
    )]
    Add {
        #[arg(long, value_name = "NAME", help = "Unique login name")]
        username: String,
        #[arg(long, value_name = "PASSWORD", help = "Account password")]
        password: Option<String>,
        #[arg(long = "first-name", value_name = "NAME", default_value = "")]
        first_name: String,
        #[arg(long = "last-name", value_name = "NAME", default_value = "")]
        last_name: String,
        #[arg(
            long,
            default_value_t = false,
            help = "Grant access to the admin views"
        )]
        staff: bool,
    },
    #[command(about = "Attach an instructor profile to a user")]
    Instructor {
        #[arg(long, value_name = "NAME")]
        username: String,
        #[arg(
            long = "part-time",
            default_value_t = false,
            help = "Mark the instructor as part time"
        )]
        part_time: bool,
        #[arg(long = "total-learners", value_name = "N", default_value_t = 0)]
        total_learners: i64,
    },
    #[command(about = "Attach a learner profile to a user")]
    Learner {
        #[arg(long, value_name = "NAME")]
        username: String,
        #[arg(long, value_name = "N", help = "Learner level")]
        level: i64,
        #[arg(long, value_name = "TEXT", default_value = "student")]
        occupation: String,
    },
}
