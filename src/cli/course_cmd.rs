use chrono::NaiveDate;
use clap::Subcommand;

#[derive(Subcommand, Debug, Clone)]
pub enum CourseCmd {
    #[command(
        about = "Create a course",
        long_about = "Create a course and link it to zero or more instructors by instructor id."
    )]
    Add {
        #[arg(long, value_name = "NAME", help = "Course name (at most 30 characters)")]
        name: String,
        #[arg(long, value_name = "TEXT", help = "Course description")]
        description: String,
        #[arg(long, value_name = "PATH", default_value = "")]
        image: String,
        #[arg(long = "pub-date", value_name = "YYYY-MM-DD")]
        pub_date: Option<NaiveDate>,
        #[arg(long, value_name = "ID", help = "Instructor id, repeatable")]
        instructor: Vec<i64>,
    },
    #[command(about = "Add a lesson to a course")]
    Lesson {
        #[arg(long, value_name = "ID")]
        course: i64,
        #[arg(long, value_name = "TITLE")]
        title: String,
        #[arg(long, value_name = "N", default_value_t = 0)]
        order: i64,
        #[arg(long, value_name = "TEXT")]
        content: String,
    },
    #[command(about = "Add an exam question to a lesson")]
    Question {
        #[arg(long, value_name = "ID")]
        lesson: i64,
        #[arg(long, value_name = "TEXT")]
        text: String,
        #[arg(long, value_name = "N", help = "Points awarded for a fully correct answer")]
        grade: u32,
    },
    #[command(about = "Add an answer choice to a question")]
    Choice {
        #[arg(long, value_name = "ID")]
        question: i64,
        #[arg(long, value_name = "TEXT")]
        text: String,
        #[arg(long, default_value_t = false)]
        correct: bool,
    },
    #[command(
        about = "List the top courses",
        long_about = "Print the most enrolled courses as JSON, the same list the index page shows."
    )]
    List,
}
