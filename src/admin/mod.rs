//! Admin presentation: which record types are editable, which children are
//! edited inline with them, and the list/filter/search views over them.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::Serialize;

use crate::auth::Principal;
use crate::storage::{
    traits::{ChoiceQuery, CourseQuery, QuestionQuery},
    StorageRead,
};
use crate::types::OnlineCourseError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Model {
    Course,
    Lesson,
    Question,
    Choice,
    Instructor,
    Learner,
}

impl Model {
    pub fn as_str(&self) -> &'static str {
        match self {
            Model::Course => "course",
            Model::Lesson => "lesson",
            Model::Question => "question",
            Model::Choice => "choice",
            Model::Instructor => "instructor",
            Model::Learner => "learner",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "course" => Ok(Model::Course),
            "lesson" => Ok(Model::Lesson),
            "question" => Ok(Model::Question),
            "choice" => Ok(Model::Choice),
            "instructor" => Ok(Model::Instructor),
            "learner" => Ok(Model::Learner),
            other => Err(format!("unknown model: {}", other)),
        }
    }
}

/// A child record type edited on its parent's page, with the number of
/// blank rows offered for new entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Inline {
    pub model: Model,
    pub extra: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ModelAdmin {
    pub model: Model,
    pub list_display: &'static [&'static str],
    pub list_filter: &'static [&'static str],
    pub search_fields: &'static [&'static str],
    pub inlines: Vec<Inline>,
}

const DEFAULT_DISPLAY: &[&str] = &["__str__"];

pub fn registry() -> Vec<ModelAdmin> {
    vec![
        ModelAdmin {
            model: Model::Course,
            list_display: &["name", "pub_date"],
            list_filter: &["pub_date"],
            search_fields: &["name", "description"],
            inlines: vec![Inline {
                model: Model::Lesson,
                extra: 5,
            }],
        },
        ModelAdmin {
            model: Model::Lesson,
            list_display: &["title", "course"],
            list_filter: &[],
            search_fields: &[],
            inlines: vec![Inline {
                model: Model::Question,
                extra: 5,
            }],
        },
        ModelAdmin {
            model: Model::Question,
            list_display: &["question_text", "lesson_title", "grade"],
            list_filter: &["lesson", "grade"],
            search_fields: &["question_text", "lesson"],
            inlines: vec![Inline {
                model: Model::Choice,
                extra: 4,
            }],
        },
        ModelAdmin {
            model: Model::Choice,
            list_display: &["question", "text"],
            list_filter: &["is_correct"],
            search_fields: &["choice_text"],
            inlines: Vec::new(),
        },
        ModelAdmin {
            model: Model::Instructor,
            list_display: DEFAULT_DISPLAY,
            list_filter: &[],
            search_fields: &[],
            inlines: Vec::new(),
        },
        ModelAdmin {
            model: Model::Learner,
            list_display: DEFAULT_DISPLAY,
            list_filter: &[],
            search_fields: &[],
            inlines: Vec::new(),
        },
    ]
}

pub fn lookup(model: Model) -> Option<ModelAdmin> {
    registry().into_iter().find(|entry| entry.model == model)
}

pub fn require_staff(principal: &Principal) -> Result<(), OnlineCourseError> {
    if principal.is_staff() {
        Ok(())
    } else {
        Err(OnlineCourseError::Forbidden)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CourseRow {
    pub id: i64,
    pub name: String,
    pub pub_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuestionRow {
    pub id: i64,
    pub question_text: String,
    pub lesson_title: String,
    pub grade: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChoiceRow {
    pub id: i64,
    pub question: String,
    pub text: String,
}

pub fn list_courses<R: StorageRead>(
    storage: &R,
    principal: &Principal,
    query: &CourseQuery,
) -> Result<Vec<CourseRow>, OnlineCourseError> {
    require_staff(principal)?;
    Ok(storage
        .search_courses(query)?
        .into_iter()
        .map(|c| CourseRow {
            id: c.id,
            name: c.name,
            pub_date: c.pub_date,
        })
        .collect())
}

pub fn list_questions<R: StorageRead>(
    storage: &R,
    principal: &Principal,
    query: &QuestionQuery,
) -> Result<Vec<QuestionRow>, OnlineCourseError> {
    require_staff(principal)?;
    Ok(storage
        .search_questions(query)?
        .into_iter()
        .map(|row| QuestionRow {
            id: row.question.id,
            question_text: truncate(&row.question.question_text, 60),
            lesson_title: row.lesson_title,
            grade: row.question.grade,
        })
        .collect())
}

pub fn list_choices<R: StorageRead>(
    storage: &R,
    principal: &Principal,
    query: &ChoiceQuery,
) -> Result<Vec<ChoiceRow>, OnlineCourseError> {
    require_staff(principal)?;
    Ok(storage
        .search_choices(query)?
        .into_iter()
        .map(|row| ChoiceRow {
            id: row.choice.id,
            question: format!(
                "{} - {}",
                row.choice.question_id,
                truncate(&row.question_text, 25)
            ),
            text: truncate(&row.choice.choice_text, 50),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{self, Registration};
    use crate::courses::test_support::{seed_course, seeded_storage, user_principal};

    #[test]
    fn registry_covers_every_model_once() {
        let entries = registry();
        assert_eq!(entries.len(), 6);
        for name in [
            "course",
            "lesson",
            "question",
            "choice",
            "instructor",
            "learner",
        ] {
            let model: Model = name.parse().unwrap();
            assert_eq!(model.to_string(), name);
            assert_eq!(entries.iter().filter(|e| e.model == model).count(), 1);
        }
        assert!("enrollment".parse::<Model>().is_err());
    }

    #[test]
    fn inlines_nest_course_down_to_choices() {
        let inline = |model| lookup(model).unwrap().inlines;
        assert_eq!(
            inline(Model::Course),
            vec![Inline {
                model: Model::Lesson,
                extra: 5
            }]
        );
        assert_eq!(
            inline(Model::Lesson),
            vec![Inline {
                model: Model::Question,
                extra: 5
            }]
        );
        assert_eq!(
            inline(Model::Question),
            vec![Inline {
                model: Model::Choice,
                extra: 4
            }]
        );
        assert!(inline(Model::Choice).is_empty());
        assert_eq!(lookup(Model::Learner).unwrap().list_display, ["__str__"]);
    }

    #[test]
    fn admin_lists_require_staff() {
        let (_dir, storage) = seeded_storage();
        let learner = user_principal(&storage, "ada");

        let err = list_courses(&storage, &learner, &CourseQuery::default()).unwrap_err();
        assert_eq!(err, OnlineCourseError::Forbidden);
        let err = list_choices(&storage, &Principal::Anonymous, &ChoiceQuery::default())
            .unwrap_err();
        assert_eq!(err, OnlineCourseError::Forbidden);
    }

    #[test]
    fn admin_rows_use_display_columns() {
        let (_dir, storage) = seeded_storage();
        let seeded = seed_course(&storage, "rust");
        let staff = Principal::User(
            auth::create_user(
                &storage,
                &Registration {
                    username: "root",
                    password: "pw",
                    first_name: "",
                    last_name: "",
                },
                true,
            )
            .unwrap(),
        );

        let courses = list_courses(&storage, &staff, &CourseQuery::default()).unwrap();
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].name, "rust");

        let questions = list_questions(
            &storage,
            &staff,
            &QuestionQuery {
                grade: Some(20),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].id, seeded.questions[1]);
        assert_eq!(questions[0].lesson_title, "Lesson 1");

        let choices = list_choices(
            &storage,
            &staff,
            &ChoiceQuery {
                search: None,
                is_correct: Some(false),
            },
        )
        .unwrap();
        assert_eq!(choices.len(), 3);
        assert_eq!(choices[0].question, format!("{} - q1", seeded.questions[0]));
        assert_eq!(choices[0].text, "c");
    }

    #[test]
    fn truncate_counts_chars() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 60), "hi");
    }
}
