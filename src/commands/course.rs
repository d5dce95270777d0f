use super::CommandRunner;
use crate::auth::Principal;
use crate::cli;
use crate::courses;
use crate::storage::{
    traits::{NewCourse, NewLesson},
    Storage, StorageTx, StorageWrite,
};
use anyhow::{bail, Context, Result};

const MAX_NAME_CHARS: usize = 30;
const MAX_DESCRIPTION_CHARS: usize = 1000;

impl CommandRunner for cli::CourseCmd {
    fn run<S: Storage>(&self, storage: &S) -> Result<()> {
        match self {
            cli::CourseCmd::Add {
                name,
                description,
                image,
                pub_date,
                instructor,
            } => {
                if name.chars().count() > MAX_NAME_CHARS {
                    bail!("course name is longer than {} characters", MAX_NAME_CHARS);
                }
                if description.chars().count() > MAX_DESCRIPTION_CHARS {
                    bail!(
                        "course description is longer than {} characters",
                        MAX_DESCRIPTION_CHARS
                    );
                }
                let tx = storage.begin_tx()?;
                let course_id = tx
                    .insert_course(&NewCourse {
                        name,
                        image,
                        description,
                        pub_date: *pub_date,
                    })
                    .context("inserting course")?;
                for instructor_id in instructor {
                    tx.add_course_instructor(course_id, *instructor_id)
                        .with_context(|| format!("linking instructor {}", instructor_id))?;
                }
                tx.commit()?;
                log::info!("📘 course {} created: {}", course_id, name);
                println!("{}", course_id);
                Ok(())
            }
            cli::CourseCmd::Lesson {
                course,
                title,
                order,
                content,
            } => {
                if storage.load_course(*course)?.is_none() {
                    bail!("no such course: {}", course);
                }
                let tx = storage.begin_tx()?;
                let lesson_id = tx
                    .insert_lesson(&NewLesson {
                        course_id: *course,
                        title,
                        order: *order,
                        content,
                    })
                    .context("inserting lesson")?;
                tx.commit()?;
                println!("{}", lesson_id);
                Ok(())
            }
            cli::CourseCmd::Question {
                lesson,
                text,
                grade,
            } => {
                let tx = storage.begin_tx()?;
                let question_id = tx
                    .insert_question(*lesson, text, *grade)
                    .with_context(|| format!("inserting question for lesson {}", lesson))?;
                tx.commit()?;
                println!("{}", question_id);
                Ok(())
            }
            cli::CourseCmd::Choice {
                question,
                text,
                correct,
            } => {
                let tx = storage.begin_tx()?;
                let choice_id = tx
                    .insert_choice(*question, text, *correct)
                    .with_context(|| format!("inserting choice for question {}", question))?;
                tx.commit()?;
                println!("{}", choice_id);
                Ok(())
            }
            cli::CourseCmd::List => {
                let listing = courses::list_courses(storage, &Principal::Anonymous)?;
                let json =
                    serde_json::to_string_pretty(&listing).context("serializing course list")?;
                println!("{}", json);
                Ok(())
            }
        }
    }
}
