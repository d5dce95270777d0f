pub mod password;

use anyhow::Context;

use crate::storage::{
    traits::{NewUser, User},
    Storage, StorageRead, StorageTx, StorageWrite,
};
use crate::types::OnlineCourseError;

/// The caller of a request. Resolved once per request from the session
/// store and handed to every operation that cares who is asking.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Principal {
    #[default]
    Anonymous,
    User(User),
}

impl Principal {
    pub fn user(&self) -> Option<&User> {
        match self {
            Principal::Anonymous => None,
            Principal::User(user) => Some(user),
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user().map(|u| u.id)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Principal::User(_))
    }

    pub fn is_staff(&self) -> bool {
        self.user().map(|u| u.is_staff).unwrap_or(false)
    }
}

/// A logged-in session: the opaque token handed to the client and its user.
#[derive(Clone, Debug)]
pub struct Session {
    pub token: String,
    pub user: User,
}

#[derive(Clone, Debug)]
pub struct Registration<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
}

pub fn new_session_token() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

fn insert_new_user<T: StorageTx>(
    tx: &T,
    registration: &Registration<'_>,
    is_staff: bool,
) -> Result<i64, OnlineCourseError> {
    if registration.username.trim().is_empty() {
        return Err(OnlineCourseError::MissingUsername);
    }
    if tx.load_user_by_username(registration.username)?.is_some() {
        return Err(OnlineCourseError::UserExists);
    }
    log::info!("New user");

    let password_hash = password::hash_password(registration.password)?;
    let user_id = tx.insert_user(&NewUser {
        username: registration.username,
        first_name: registration.first_name,
        last_name: registration.last_name,
        password_hash: &password_hash,
        is_staff,
    })?;
    Ok(user_id)
}

fn start_session<T: StorageTx>(tx: &T, user_id: i64) -> Result<Session, OnlineCourseError> {
    let token = new_session_token();
    tx.insert_session(&token, user_id)?;
    let user = tx
        .load_user(user_id)?
        .with_context(|| format!("user {} vanished while logging in", user_id))?;
    Ok(Session { token, user })
}

/// Create an account without logging it in.
pub fn create_user<S: Storage>(
    storage: &S,
    registration: &Registration<'_>,
    is_staff: bool,
) -> Result<User, OnlineCourseError> {
    let tx = storage.begin_tx()?;
    let user_id = insert_new_user(&tx, registration, is_staff)?;
    let user = tx
        .load_user(user_id)?
        .with_context(|| format!("user {} vanished after insert", user_id))?;
    tx.commit()?;
    Ok(user)
}

/// Create an account if the username is free and log it in.
pub fn register<S: Storage>(
    storage: &S,
    registration: &Registration<'_>,
) -> Result<Session, OnlineCourseError> {
    let tx = storage.begin_tx()?;
    let user_id = insert_new_user(&tx, registration, false)?;
    let session = start_session(&tx, user_id)?;
    tx.commit()?;
    Ok(session)
}

pub fn authenticate<R: StorageRead>(
    storage: &R,
    username: &str,
    password: &str,
) -> Result<Option<User>, OnlineCourseError> {
    let user = storage.load_user_by_username(username)?;
    Ok(user.filter(|u| password::verify_password(password, &u.password_hash)))
}

pub fn login<S: Storage>(
    storage: &S,
    username: &str,
    password: &str,
) -> Result<Session, OnlineCourseError> {
    let Some(user) = authenticate(storage, username, password)? else {
        return Err(OnlineCourseError::InvalidCredentials);
    };
    let tx = storage.begin_tx()?;
    let session = start_session(&tx, user.id)?;
    tx.commit()?;
    Ok(session)
}

/// Tear down the session behind `token`. Unknown or missing tokens are fine.
pub fn logout<S: Storage>(storage: &S, token: Option<&str>) -> Result<(), OnlineCourseError> {
    let Some(token) = token else {
        return Ok(());
    };
    let tx = storage.begin_tx()?;
    tx.delete_session(token)?;
    tx.commit()?;
    Ok(())
}

pub fn current_principal<R: StorageRead>(
    storage: &R,
    token: Option<&str>,
) -> Result<Principal, OnlineCourseError> {
    let Some(token) = token else {
        return Ok(Principal::Anonymous);
    };
    Ok(storage
        .load_session_user(token)?
        .map(Principal::User)
        .unwrap_or_default())
}
