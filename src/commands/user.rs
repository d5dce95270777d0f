use std::io::IsTerminal;

use super::CommandRunner;
use crate::auth::{self, Registration};
use crate::cli;
use crate::storage::{traits::User, Storage, StorageTx, StorageWrite};
use anyhow::{bail, Context, Result};

/// Ask for a new password twice. Only works on an interactive terminal.
fn prompt_password() -> Result<String> {
    if !std::io::stdin().is_terminal() {
        bail!("--password is required when stdin is not a terminal");
    }
    let p1 = rpassword::prompt_password("Password: ").context("read password")?;
    let p2 = rpassword::prompt_password("Confirm password: ").context("confirm password")?;
    if p1 != p2 {
        bail!("passwords do not match");
    }
    if p1.is_empty() {
        bail!("password must not be empty");
    }
    Ok(p1)
}

fn require_user<S: Storage>(storage: &S, username: &str) -> Result<User> {
    storage
        .load_user_by_username(username)
        .with_context(|| format!("loading user {}", username))?
        .with_context(|| format!("no such user: {}", username))
}

impl CommandRunner for cli::UserCmd {
    fn run<S: Storage>(&self, storage: &S) -> Result<()> {
        match self {
            cli::UserCmd::Add {
                username,
                password,
                first_name,
                last_name,
                staff,
            } => {
                let password = match password {
                    Some(password) => password.clone(),
                    None => prompt_password()?,
                };
                let registration = Registration {
                    username,
                    password: &password,
                    first_name,
                    last_name,
                };
                let user = auth::create_user(storage, &registration, *staff)
                    .with_context(|| format!("creating user {}", username))?;
                log::info!("👤 created user {} (staff={})", user.username, user.is_staff);
                println!("{}", user.id);
                Ok(())
            }
            cli::UserCmd::Instructor {
                username,
                part_time,
                total_learners,
            } => {
                let user = require_user(storage, username)?;
                let tx = storage.begin_tx()?;
                let id = tx
                    .insert_instructor(user.id, !*part_time, *total_learners)
                    .context("inserting instructor")?;
                tx.commit()?;
                log::info!("🎓 instructor {} for user {}", id, user.username);
                println!("{}", id);
                Ok(())
            }
            cli::UserCmd::Learner {
                username,
                level,
                occupation,
            } => {
                let user = require_user(storage, username)?;
                let tx = storage.begin_tx()?;
                let id = tx
                    .insert_learner(user.id, *level, occupation)
                    .context("inserting learner")?;
                tx.commit()?;
                let learner = storage
                    .load_learner(user.id)?
                    .context("learner vanished after insert")?;
                log::info!(
                    "🧑‍🎓 learner {} for user {} ({})",
                    id,
                    user.username,
                    learner.occupation
                );
                println!("{}", id);
                Ok(())
            }
        }
    }
}
