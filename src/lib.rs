//! # Inkpost (blogging backend)
//!
//! `inkpost` serves the user, session and comment API behind the blog frontend.
//!
//! ## Users
//!
//! Usernames are 7 to 20 lowercase letters or digits; passwords are at least 6
//! characters and stored as Argon2id hashes. Responses never include the hash.
//! Profile updates only touch username, email, password and profile picture, so
//! a body carrying `isAdmin` cannot grant admin rights.
//!
//! ## Sessions
//!
//! Signing in sets an `access_token` cookie holding a signed token with the
//! user id and admin flag. Signing out clears the cookie.
//!
//! ## Authorization
//!
//! - Profile updates: the owner only (401 otherwise).
//! - Profile deletes: the owner or an admin (401 otherwise).
//! - Listing users or all comments: admins only (403 otherwise).
//! - Editing or deleting a comment: the author or an admin (403 otherwise).
//!
//! ## Storage
//!
//! Postgres in production (`postgres://` DSN), an in-memory store for tests and
//! local runs (`memory://`).

pub mod api;
pub mod cli;
pub mod client;
pub mod store;

pub use api::{APP_USER_AGENT, GIT_COMMIT_HASH};
